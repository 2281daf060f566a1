//! Public entry point: wires the lexer, parser, resolver, and interpreter
//! into the one pipeline a caller actually needs. No typestate builder here
//! — Zoof has no module loader or host-`Stdout` trait to configure ahead of
//! time, just a session to run source against.
//!
//! Source text is leaked to `'static` exactly once, here, because every
//! function value a program defines holds a `Rc<FunctionDecl<'static>>` that
//! may outlive the call that parsed it (see `callable::ZoofFunction`): a
//! `Source` object is kept alive for as long as anything defined within it
//! might still be called.

pub mod archetype;
pub mod builtins;
pub mod callable;
pub mod environment;
pub mod interpreter;
pub mod runtime_error;
pub mod value;

use std::rc::Rc;

pub use zoof_diag::Report;
use zoof_diag::Source;

use crate::environment::Environment;
use crate::interpreter::{Interpreter, StdoutSink};
pub use crate::interpreter::Sink;
pub use crate::value::Value;

/// Which error class (if any) a run ended with, and the exit code a CLI
/// front-end should use for it. Mirrors spec.md §6/§7: a syntax or name
/// error both abort before the program ever runs and share exit code 65; a
/// runtime fault can only happen after both passed, and exits 70.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
  pub had_syntax_error: bool,
  pub had_analysis_error: bool,
  pub had_runtime_error: bool,
}

impl Diagnostics {
  pub fn is_clean(&self) -> bool {
    *self == Self::default()
  }

  pub fn exit_code(&self) -> i32 {
    if self.had_syntax_error || self.had_analysis_error {
      65
    } else if self.had_runtime_error {
      70
    } else {
      0
    }
  }
}

/// Every diagnostic collected while running one piece of source, plus
/// whatever value a trailing expression produced (used only by
/// [`Zoof::eval_line`], always `None` from [`Zoof::run`]).
pub struct Outcome {
  pub diagnostics: Diagnostics,
  pub reports: Vec<Report>,
  pub value: Option<Value>,
}

/// One interpreter session. Holds the global environment and `print`
/// destination across calls, so a REPL can run one line at a time while
/// keeping every earlier line's variables and functions in scope.
pub struct Zoof {
  interp: Interpreter,
}

impl Default for Zoof {
  fn default() -> Self {
    Self::new()
  }
}

impl Zoof {
  pub fn new() -> Self {
    Self::with_sink(Box::new(StdoutSink))
  }

  pub fn with_sink(sink: Box<dyn Sink>) -> Self {
    Self { interp: Interpreter::new(sink) }
  }

  /// A fresh session sharing `globals` with an existing one. The REPL
  /// doesn't use this directly — each `Zoof` already keeps its own globals
  /// across calls to `eval_line` — but it lets an embedder fork a session
  /// (e.g. to run an untrusted snippet against a known-good global state
  /// without risking it).
  pub fn with_globals(globals: Rc<Environment>, sink: Box<dyn Sink>) -> Self {
    Self {
      interp: Interpreter::with_globals(globals, sink),
    }
  }

  pub fn globals(&self) -> Rc<Environment> {
    self.interp.globals()
  }

  /// Runs `src` as a complete program: lex, parse, resolve, interpret, in
  /// that order, stopping at the first stage that reports an error. `name`
  /// is whatever the caller wants diagnostics to show as the file name
  /// (a path, or `"<stdin>"`).
  pub fn run(&mut self, name: &str, src: &str) -> Outcome {
    self.execute(name, src, false)
  }

  /// Like [`run`](Self::run), but a trailing bare expression statement is
  /// evaluated for its value instead of discarded — what a REPL echoes back
  /// after a line with no explicit `print`.
  pub fn eval_line(&mut self, name: &str, src: &str) -> Outcome {
    self.execute(name, src, true)
  }

  fn execute(&mut self, name: &str, src: &str, echo_trailing: bool) -> Outcome {
    tracing::debug!(name, bytes = src.len(), "running source");
    let source = Source::new(name.to_string(), src.to_string());
    let leaked: &'static str = Box::leak(src.to_string().into_boxed_str());

    let (program, parse_errors) = zoof_syntax::parse(leaked);
    if !parse_errors.is_empty() {
      tracing::warn!(name, count = parse_errors.len(), "syntax errors");
      return Outcome {
        diagnostics: Diagnostics {
          had_syntax_error: true,
          ..Diagnostics::default()
        },
        reports: parse_errors.iter().map(|e| e.to_report()).collect(),
        value: None,
      };
    }

    let module_names = self.interp.globals().bound_names();
    let module_names: Vec<&str> = module_names.iter().map(|s| s.as_str()).collect();
    let resolve_errors = zoof_resolve::resolve_repl_line(&program, &source, builtins::NAMES, &module_names);
    if !resolve_errors.is_empty() {
      tracing::warn!(name, count = resolve_errors.len(), "resolution errors");
      return Outcome {
        diagnostics: Diagnostics {
          had_analysis_error: true,
          ..Diagnostics::default()
        },
        reports: resolve_errors.iter().map(|e| e.to_report()).collect(),
        value: None,
      };
    }

    let result = if echo_trailing {
      self.interp.interpret_repl_line(&program)
    } else {
      self.interp.interpret(&program).map(|()| None)
    };

    match result {
      Ok(value) => Outcome {
        diagnostics: Diagnostics::default(),
        reports: Vec::new(),
        value,
      },
      Err(err) => {
        tracing::warn!(name, code = err.code, "runtime error");
        Outcome {
          diagnostics: Diagnostics {
            had_runtime_error: true,
            ..Diagnostics::default()
          },
          reports: vec![err.to_report(&source)],
          value: None,
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  struct Capture(Rc<RefCell<Vec<String>>>);
  impl Sink for Capture {
    fn print_line(&mut self, line: &str) {
      self.0.borrow_mut().push(line.to_string());
    }
  }

  #[test]
  fn run_reports_nothing_on_success() {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let mut zoof = Zoof::with_sink(Box::new(Capture(lines.clone())));
    let outcome = zoof.run("<test>", "print 1 + 1\n");
    assert!(outcome.diagnostics.is_clean());
    assert_eq!(outcome.diagnostics.exit_code(), 0);
    assert_eq!(*lines.borrow(), vec!["2.0".to_string()]);
  }

  #[test]
  fn syntax_error_exits_65_without_running() {
    let mut zoof = Zoof::new();
    let outcome = zoof.run("<test>", "if do\n    print 1\n");
    assert!(outcome.diagnostics.had_syntax_error);
    assert_eq!(outcome.diagnostics.exit_code(), 65);
    assert!(!outcome.reports.is_empty());
  }

  #[test]
  fn undefined_name_exits_65() {
    let mut zoof = Zoof::new();
    let outcome = zoof.run("<test>", "print undefinedThing\n");
    assert!(outcome.diagnostics.had_analysis_error);
    assert_eq!(outcome.diagnostics.exit_code(), 65);
  }

  #[test]
  fn runtime_error_exits_70() {
    let mut zoof = Zoof::new();
    let outcome = zoof.run("<test>", "if 1 do\n    print 1\n");
    assert!(outcome.diagnostics.had_runtime_error);
    assert_eq!(outcome.diagnostics.exit_code(), 70);
  }

  #[test]
  fn globals_persist_between_lines() {
    let mut zoof = Zoof::new();
    assert!(zoof.run("<repl>", "x = 41\n").diagnostics.is_clean());
    let outcome = zoof.run("<repl>", "print x + 1\n");
    assert!(outcome.diagnostics.is_clean());
  }
}
