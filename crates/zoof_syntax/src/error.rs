use zoof_diag::{Loc, Report};

/// A syntax-time diagnostic (`E1xxx`), independent of `zoof_diag::Report`
/// until rendering time so the parser/lexer don't need a `Source` on hand
/// while they run.
#[derive(Debug, Clone)]
pub struct Error {
  pub code: &'static str,
  pub message: String,
  pub start: Loc,
  pub end: Loc,
  pub explanation: String,
}

impl Error {
  pub fn new(code: &'static str, message: impl Into<String>, start: Loc, end: Loc, explanation: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
      start,
      end,
      explanation: explanation.into(),
    }
  }

  pub fn to_report(&self) -> Report {
    Report::syntax(self.code, self.message.clone(), self.start, self.end, self.explanation.clone())
  }
}
