//! The interpreter's own error type (`E8xxx`), independent of
//! `zoof_diag::Report` until a `Source` is available to resolve spans into
//! line/column pairs — mirroring how `zoof_syntax::Error`/`zoof_resolve::Error`
//! stay source-agnostic until rendering time.

use thiserror::Error;
use zoof_diag::{Loc, Report};
use zoof_span::Span;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
  pub code: &'static str,
  pub message: String,
  pub span: Span,
  pub explanation: String,
}

impl RuntimeError {
  pub fn new(code: &'static str, span: Span, message: impl Into<String>, explanation: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
      span,
      explanation: explanation.into(),
    }
  }

  pub fn to_report(&self, source: &zoof_diag::Source) -> Report {
    let (l1, c1) = source.locate(self.span.start);
    let (l2, c2) = source.locate(self.span.end);
    Report::runtime(self.code, self.message.clone(), Loc::new(l1, c1), Loc::new(l2, c2), self.explanation.clone())
  }
}

pub type ExecResult<T> = Result<T, RuntimeError>;
