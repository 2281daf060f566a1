//! The tree-walking evaluator. Statement and expression dispatch live in
//! `interpreter::stmt`/`interpreter::expr`; everything here is the shared
//! state and the two call boundaries (`exec_block`/`eval_in`) only a
//! function call crosses.
//!
//! Grounded on `zoofc1/interpreter.py`'s `InterpreterVisitor`, with Python's
//! exception-based `Return`/`Break` replaced by an explicit `Flow` value
//! threaded back up through `ExecResult`, per spec.md's design note against
//! exceptions-as-control-flow in a systems language.

pub mod expr;
pub mod stmt;

use std::rc::Rc;

use zoof_syntax::ast::{Program, Stmt};

use crate::builtins;
use crate::callable::ZoofFunction;
use crate::environment::Environment;
use crate::runtime_error::{ExecResult, RuntimeError};
use crate::value::Value;

/// What a block of statements did besides falling off the end: `Return`
/// carries a function's result back to its `call()`; `Break` unwinds to the
/// nearest enclosing loop. Both keep propagating through `Do`/`If` blocks,
/// which introduce no scope of their own and so must not absorb either.
pub enum Flow {
  Return(Value),
  Break,
}

pub struct Interpreter {
  pub(crate) env: Rc<Environment>,
  pub(crate) globals: Rc<Environment>,
  pub(crate) loop_depth: u32,
  /// Mirrors the reference `self.maybeClosures`: one frame per active call,
  /// holding every function declared during that call so its free variables
  /// can be checked against the call's environment once it returns. Empty
  /// at module scope, so top-level declarations are never restricted.
  maybe_closures: Vec<Vec<Rc<ZoofFunction>>>,
  pub(crate) sink: Box<dyn Sink>,
}

/// Where `print` output (and the REPL's trailing-expression echo) goes.
/// The CLI's default sink writes to `stdout`; the REPL writes into its own
/// line buffer; tests supply an in-memory `Vec<String>`.
pub trait Sink {
  fn print_line(&mut self, line: &str);
}

pub struct StdoutSink;

impl Sink for StdoutSink {
  fn print_line(&mut self, line: &str) {
    println!("{line}");
  }
}

impl Interpreter {
  pub fn new(sink: Box<dyn Sink>) -> Self {
    let builtins = Environment::root(builtins::bindings());
    let globals = Environment::child(&builtins);
    Self {
      env: globals.clone(),
      globals,
      loop_depth: 0,
      maybe_closures: Vec::new(),
      sink,
    }
  }

  /// Reuses an existing global environment, for a REPL session that wants
  /// variables and functions from one line visible in the next.
  pub fn with_globals(globals: Rc<Environment>, sink: Box<dyn Sink>) -> Self {
    Self {
      env: globals.clone(),
      globals,
      loop_depth: 0,
      maybe_closures: Vec::new(),
      sink,
    }
  }

  pub fn globals(&self) -> Rc<Environment> {
    self.globals.clone()
  }

  /// Runs every top-level statement. A bare `return`/`break` surfacing here
  /// means one reached module scope with no enclosing function or loop.
  pub fn interpret(&mut self, program: &Program<'static>) -> ExecResult<()> {
    for stmt in &program.statements {
      if let Some(flow) = self.exec_stmt(stmt)? {
        return Err(self.escaped_flow_error(stmt, flow));
      }
    }
    Ok(())
  }

  /// Like [`interpret`](Self::interpret), but returns the value of a
  /// trailing expression-statement instead of discarding it — what the REPL
  /// echoes back after a line with no explicit `print`.
  pub fn interpret_repl_line(&mut self, program: &Program<'static>) -> ExecResult<Option<Value>> {
    let mut last = None;
    for stmt in &program.statements {
      last = match &**stmt {
        zoof_syntax::ast::StmtKind::Expression(expr) => Some(self.eval_expr(expr)?),
        _ => {
          if let Some(flow) = self.exec_stmt(stmt)? {
            return Err(self.escaped_flow_error(stmt, flow));
          }
          None
        }
      };
    }
    Ok(last)
  }

  fn escaped_flow_error(&self, stmt: &Stmt<'static>, flow: Flow) -> RuntimeError {
    match flow {
      Flow::Break => RuntimeError::new(
        "E8311",
        stmt.span,
        "`break` used outside of a loop.",
        "`break` can only appear inside the body of a `for` or `while` loop.",
      ),
      Flow::Return(_) => RuntimeError::new(
        "E8312",
        stmt.span,
        "`return` used outside of a function.",
        "`return` can only appear inside the body of a function, method, getter, or setter.",
      ),
    }
  }

  fn exec_statements(&mut self, stmts: &[Stmt<'static>]) -> ExecResult<Option<Flow>> {
    for stmt in stmts {
      if let Some(flow) = self.exec_stmt(stmt)? {
        return Ok(Some(flow));
      }
    }
    Ok(None)
  }

  /// The only place a new `Environment` is created: a function call. Pushes
  /// a `maybe_closures` frame, runs `stmts` in `env`, then drains the frame
  /// against `env` before restoring the caller's environment — matching the
  /// reference `executeBlock`'s `finally` clause exactly.
  pub fn exec_block(&mut self, stmts: &[Stmt<'static>], env: Rc<Environment>) -> ExecResult<Option<Flow>> {
    let previous = std::mem::replace(&mut self.env, env);
    self.maybe_closures.push(Vec::new());
    let result = self.exec_statements(stmts);
    let declared = self.maybe_closures.pop().unwrap_or_default();
    for func in declared {
      func.mark_if_captured(&self.env);
    }
    self.env = previous;
    result
  }

  /// Same call-boundary treatment as `exec_block`, for an `its`-expression
  /// function body.
  pub fn eval_in(&mut self, expr: &zoof_syntax::ast::Expr<'static>, env: Rc<Environment>) -> ExecResult<Value> {
    let previous = std::mem::replace(&mut self.env, env);
    self.maybe_closures.push(Vec::new());
    let result = self.eval_expr(expr);
    let declared = self.maybe_closures.pop().unwrap_or_default();
    for func in declared {
      func.mark_if_captured(&self.env);
    }
    self.env = previous;
    result
  }

  /// Registers a newly declared function with the innermost active call, if
  /// any, so it is subject to the closure-capture check once that call
  /// returns. A no-op at module scope.
  pub(crate) fn track_nested_function(&mut self, func: &Rc<ZoofFunction>) {
    if let Some(frame) = self.maybe_closures.last_mut() {
      frame.push(func.clone());
    }
  }

  /// Zoof's `isTruthy` is strict: only a literal `Bool` is accepted wherever
  /// a condition is required, matching the reference `isTruthy`'s refusal to
  /// treat `nil`/`0`/`""` as falsy.
  pub(crate) fn require_bool(&self, value: &Value, span: zoof_span::Span) -> ExecResult<bool> {
    value.as_strict_bool().ok_or_else(|| {
      RuntimeError::new(
        "E8295",
        span,
        format!("Cannot convert {} to Bool.", value.type_name()),
        "`if`, `while`, and the condition of a for-loop's range all require an actual `Bool` value, not something merely truthy.",
      )
    })
  }

  /// A dynamic, by-name lookup through the environment chain, used only
  /// where the resolver never assigns a depth: `impl ... for` looking up its
  /// struct/trait names, and the `..`-access privacy check's `this`/`This`.
  pub(crate) fn lookup_name(&self, ident: &zoof_syntax::ast::Ident<'static>, span: zoof_span::Span) -> ExecResult<Value> {
    self.env.lookup_name(ident).ok_or_else(|| {
      RuntimeError::new(
        "E8201",
        span,
        format!("Undefined name `{ident}`."),
        "This name isn't declared by any `struct`, `trait`, `func`, or assignment visible from here.",
      )
    })
  }
}
