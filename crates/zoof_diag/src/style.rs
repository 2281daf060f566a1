use std::fmt;
use std::fmt::Display;

use owo_colors as colors;

/// Optional ANSI styling applied to report headers when the embedder asks
/// for it (the CLI probes `supports-color`/`atty` before enabling this).
pub struct Style {
  pub enabled: bool,
  pub header: colors::Style,
  pub caret: colors::Style,
}

impl Style {
  pub fn plain() -> Self {
    Self {
      enabled: false,
      header: colors::Style::new(),
      caret: colors::Style::new(),
    }
  }

  pub fn header<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    Styled {
      inner,
      style: self.enabled.then_some(&self.header),
    }
  }

  pub fn caret<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    Styled {
      inner,
      style: self.enabled.then_some(&self.caret),
    }
  }
}

pub struct Styled<'a, T: Display + 'a> {
  inner: T,
  style: Option<&'a colors::Style>,
}

impl<'a, T: Display> Display for Styled<'a, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use colors::OwoColorize;

    if let Some(style) = self.style {
      write!(f, "{}", self.inner.style(*style))
    } else {
      write!(f, "{}", self.inner)
    }
  }
}
