use std::fmt;

use crate::source::Source;
use crate::style::Style;

/// Which of the three error classes a report belongs to — drives both the
/// printed `ErrorType` name and the permitted code prefix/flag it sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
  /// Lexer/parser errors. Code prefix `E1`.
  Syntax,
  /// Resolver errors. Code prefix `E2`.
  Name,
  /// Interpreter errors. Code prefix `E8`.
  Runtime,
}

impl Level {
  fn label(self) -> &'static str {
    match self {
      Level::Syntax => "SyntaxError",
      Level::Name => "NameError",
      Level::Runtime => "RuntimeError",
    }
  }

  fn code_prefix(self) -> &'static str {
    match self {
      Level::Syntax => "E1",
      Level::Name => "E2",
      Level::Runtime => "E8",
    }
  }
}

/// A 1-based `(line, column)` position, as stamped directly by the lexer on
/// every token and copied onto AST node spans by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Loc {
  pub line: u32,
  pub column: u32,
}

impl Loc {
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }
}

/// A fully-formed diagnostic, ready to render against the [`Source`] it was
/// raised against.
pub struct Report {
  level: Level,
  code: &'static str,
  message: String,
  start: Loc,
  end: Loc,
  explanation: String,
  extra_lines: Vec<u32>,
  lines_before: u32,
}

impl Report {
  fn new(
    level: Level,
    code: &'static str,
    message: impl Into<String>,
    start: Loc,
    end: Loc,
    explanation: impl Into<String>,
  ) -> Self {
    debug_assert!(
      code.starts_with(level.code_prefix()) && code.len() == 5,
      "error code {code} must start with {} and be exactly 5 characters",
      level.code_prefix()
    );
    Self {
      level,
      code,
      message: message.into(),
      start,
      end,
      explanation: explanation.into(),
      extra_lines: Vec::new(),
      lines_before: 0,
    }
  }

  pub fn syntax(code: &'static str, message: impl Into<String>, start: Loc, end: Loc, explanation: impl Into<String>) -> Self {
    Self::new(Level::Syntax, code, message, start, end, explanation)
  }

  pub fn name(code: &'static str, message: impl Into<String>, start: Loc, end: Loc, explanation: impl Into<String>) -> Self {
    Self::new(Level::Name, code, message, start, end, explanation)
  }

  pub fn runtime(code: &'static str, message: impl Into<String>, start: Loc, end: Loc, explanation: impl Into<String>) -> Self {
    Self::new(Level::Runtime, code, message, start, end, explanation)
  }

  /// Expand the shown snippet to include additional (usually earlier) lines
  /// referenced by other tokens, matching `_show_error`'s `includeTokens`.
  pub fn include_line(mut self, line: u32) -> Self {
    self.extra_lines.push(line);
    self
  }

  pub fn lines_before(mut self, n: u32) -> Self {
    self.lines_before = n;
    self
  }

  pub fn code(&self) -> &'static str {
    self.code
  }

  pub fn level(&self) -> Level {
    self.level
  }

  /// Renders the bit-exact report format:
  ///
  /// ```text
  /// -- <ErrorType> (<Code>) --------------- <file>:<line>
  /// <message>
  ///
  /// <line>| <source line>
  ///      | <carets>
  /// <explanation>
  /// ```
  ///
  /// Ported directly from `ErrorHandler._show_error` in the original
  /// implementation: bounds are resolved in terms of 1-based source lines,
  /// the header is padded to a fixed total width, and caret placement is
  /// computed per displayed line (single-line, first/interior/last of a
  /// multi-line span).
  pub fn render(&self, source: &Source) -> String {
    self.render_with(source, &Style::plain())
  }

  pub fn render_with(&self, source: &Source, style: &Style) -> String {
    let mut out = String::new();

    let line1 = self.start.line;
    let column1 = self.start.column;
    let line2 = self.end.line;
    let column2 = self.end.column;

    let line_offset = source.line_offset() as i64;
    let line_index1 = (line1 as i64 - line_offset) as i64;
    let line_index2 = (line2 as i64 - line_offset) as i64;

    let mut line_index3 = line_index1;
    let mut line_index4 = line_index2;
    for _ in 0..self.lines_before {
      while line_index3 > 0 && source.line((line_index3 + line_offset) as u32).trim().is_empty() {
        line_index3 -= 1;
      }
      line_index3 -= 1;
    }
    for &extra_line in &self.extra_lines {
      let idx = extra_line as i64 - line_offset;
      line_index3 = line_index3.min(idx);
      line_index4 = line_index4.max(idx);
    }
    let line_index3 = line_index3.max(0);

    let chars_for_lineno = (line_index2 + 1).to_string().len();

    let title = format!("-- {} ({}) ", self.level.label(), self.code);
    let link = format!(" {}:{}", source.name(), line1);
    let padding = 80usize.saturating_sub(title.len() + link.len());
    let header = format!("{title}{}{link}", "-".repeat(padding));
    out.push_str(&style.header(header).to_string());
    out.push('\n');

    out.push('\n');
    out.push_str(&self.message);
    out.push('\n');
    out.push('\n');

    for line_index in line_index3..=line_index4 {
      let absolute_line = (line_index + line_offset) as u32;
      let lineno = format!("{:>width$}", line_index + 1, width = chars_for_lineno);
      let prefix1 = format!("{lineno}| ");
      let prefix2 = format!("{}| ", " ".repeat(lineno.len()));
      let prefix3 = " ".repeat(prefix1.chars().count());

      let line_text = source.line(absolute_line).trim_end();
      out.push_str(&prefix1);
      out.push_str(line_text);
      out.push('\n');

      let line_len = line_text.chars().count();

      if line_index < line_index1 {
        // line precedes the span; no carets
      } else if line_index == line_index1 {
        let carets = if line_index1 == line_index2 {
          "^".repeat((column2.saturating_sub(column1)) as usize)
        } else {
          "^".repeat(line_len.saturating_sub(column1 as usize))
        };
        let prefix = if line_index == line_index2 { &prefix3 } else { &prefix2 };
        out.push_str(prefix);
        out.push_str(&" ".repeat((column1.saturating_sub(1)) as usize));
        out.push_str(&style.caret(carets).to_string());
        out.push('\n');
      } else if line_index < line_index2 {
        out.push_str(&prefix2);
        out.push_str(&style.caret("^".repeat(line_len)).to_string());
        out.push('\n');
      } else if line_index == line_index2 {
        out.push_str(&prefix2);
        out.push_str(&style.caret("^".repeat(column1 as usize)).to_string());
        out.push('\n');
      }
    }

    out.push_str(&self.explanation);
    out
  }
}

impl fmt::Debug for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Report")
      .field("level", &self.level)
      .field("code", &self.code)
      .field("message", &self.message)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_line_caret() {
    let source = Source::new("example.zf", "if 1 do\n    print 'x'\n");
    let report = Report::runtime(
      "E8295",
      "Cannot convert Number to bool.",
      Loc::new(1, 4),
      Loc::new(1, 5),
      "Zoof does not perform truthy coercion: `if` conditions must evaluate\nto an actual boolean value.",
    );

    let rendered = report.render(&source);
    assert!(rendered.starts_with("-- RuntimeError (E8295) "));
    assert!(rendered.contains("example.zf:1"));
    assert!(rendered.contains("1| if 1 do"));
    assert!(rendered.contains(" | "));
    assert!(rendered.contains('^'));
    assert!(rendered.ends_with("to an actual boolean value."));
  }

  #[test]
  fn header_padding_reaches_fixed_width() {
    let source = Source::new("f.zf", "x\n");
    let report = Report::syntax("E1001", "oops", Loc::new(1, 1), Loc::new(1, 2), "explanation");
    let rendered = report.render(&source);
    let header = rendered.lines().next().unwrap();
    assert_eq!(header.len(), 80.max(header.len()));
  }
}
