//! Callable values: the `Callable` trait plus the two things that implement
//! it, `ZoofFunction` (user-defined `func`/`method`/`getter`/`setter`
//! bodies) and `Native` (the handful of builtins in `builtins.rs`).
//!
//! `ZoofFunction`'s closure restriction is ported directly from
//! `zoofc1/interpreter.py`'s `ZoofFunction.call`/`popEnvironment` pairing:
//! Zoof has no block scoping below the function level, so an assignment
//! always declares into the *current* environment. Inside a function body
//! that means writing to a name the resolver recorded as free creates a new
//! local shadow rather than mutating the enclosing binding — which is almost
//! never what the author meant, so the runtime treats it as an error on the
//! function's *next* call rather than silently doing the wrong thing.

use std::cell::RefCell;
use std::rc::Rc;

use zoof_syntax::ast::{FuncBody, FuncKind, FunctionDecl};

use crate::environment::Environment;
use crate::interpreter::{Flow, Interpreter};
use crate::runtime_error::{ExecResult, RuntimeError};
use crate::value::Value;

pub trait Callable {
  fn name(&self) -> &str;
  fn arity(&self) -> usize;
  fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> ExecResult<Value>;
}

/// A user-defined function, method, getter, or setter. `this`/`This` (for
/// impl and trait members) are threaded in as extra bindings at call time
/// rather than stored here, since one `ZoofFunction` can be shared by every
/// instance of its struct (see `BoundMethod`).
///
/// The closure restriction is NOT a self-check: a function's `free_vars`
/// are checked against the environment of whatever *enclosing* call it was
/// declared in, once that enclosing call returns (see
/// `Interpreter::exec_block`'s draining of its `maybe_closures` frame). A
/// function declared at module scope is never drained, so it can capture
/// freely — only functions nested inside another call are restricted.
pub struct ZoofFunction {
  pub declaration: Rc<FunctionDecl<'static>>,
  pub closure: Rc<Environment>,
  /// Names this function reads from an enclosing scope, per the resolver.
  free_vars: Vec<Box<str>>,
  /// Free variable names the declaring call's environment was found to hold
  /// once that call returned. Once non-empty, every subsequent call of this
  /// function is rejected.
  captured: RefCell<Vec<Box<str>>>,
}

impl ZoofFunction {
  pub fn new(declaration: Rc<FunctionDecl<'static>>, closure: Rc<Environment>) -> Self {
    let free_vars = declaration.free_vars.borrow().iter().map(|s| s.as_str().into()).collect();
    Self {
      declaration,
      closure,
      free_vars,
      captured: RefCell::new(Vec::new()),
    }
  }

  pub fn kind(&self) -> FuncKind {
    self.declaration.kind
  }

  fn display_name(&self) -> &str {
    self.declaration.name.as_ref().map(|n| &**n as &str).unwrap_or("<anonymous>")
  }

  pub fn free_vars(&self) -> &[Box<str>] {
    &self.free_vars
  }

  /// Checks this function's free variables against `enclosing_env` (the
  /// environment of the call this function was declared inside, now that
  /// the call has returned). Any name found present is recorded as
  /// captured, permanently blocking future calls.
  pub fn mark_if_captured(&self, enclosing_env: &Environment) {
    if self.free_vars.is_empty() {
      return;
    }
    let found: Vec<Box<str>> = self.free_vars.iter().filter(|name| enclosing_env.has_local(name)).cloned().collect();
    if !found.is_empty() {
      *self.captured.borrow_mut() = found;
    }
  }

  /// Runs the body with `extra` bindings (`this`/`This`, when called as a
  /// bound method) already declared in the fresh call environment.
  pub fn invoke(&self, interp: &mut Interpreter, args: Vec<Value>, extra: &[(Box<str>, Value)]) -> ExecResult<Value> {
    if !self.captured.borrow().is_empty() {
      return Err(RuntimeError::new(
        "E8410",
        self.declaration.name.as_ref().map(|n| n.span).unwrap_or_default(),
        "Closures are not supported at the moment.",
        "This function reads a variable from an enclosing scope and a previous call wrote to a \
         variable of the same name, which this runtime cannot represent without real closures.",
      ));
    }

    let call_env = Environment::child(&self.closure);
    for (name, value) in extra {
      call_env.define(name, value.clone());
    }
    for (param, arg) in self.declaration.params.iter().zip(args) {
      call_env.define(&**param as &str, arg);
    }

    let result = match &self.declaration.body {
      FuncBody::Block(stmts) => match interp.exec_block(stmts, call_env)? {
        Some(Flow::Return(value)) => value,
        Some(Flow::Break) => {
          return Err(RuntimeError::new(
            "E8420",
            self.declaration.name.as_ref().map(|n| n.span).unwrap_or_default(),
            "`break` used outside of a loop.",
            "A function body that falls through to its end without hitting a loop cannot break out of one.",
          ));
        }
        None => Value::Nil,
      },
      FuncBody::Expr(expr) => interp.eval_in(expr, call_env)?,
    };

    Ok(result)
  }
}

impl Callable for ZoofFunction {
  fn name(&self) -> &str {
    self.display_name()
  }

  fn arity(&self) -> usize {
    self.declaration.params.len()
  }

  fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> ExecResult<Value> {
    self.invoke(interp, args, &[])
  }
}

/// A `ZoofFunction` bound to a receiver, produced by `Get` on an `Instance`.
/// `this` resolves to the instance, `This` to its struct archetype, matching
/// the synthetic bindings the resolver installs for impl/trait member
/// bodies (see `zoof_resolve::resolver::resolve_function_body`).
pub struct BoundMethod {
  pub receiver: Value,
  pub this_type: Value,
  pub func: Rc<ZoofFunction>,
}

impl Callable for BoundMethod {
  fn name(&self) -> &str {
    self.func.name()
  }

  fn arity(&self) -> usize {
    self.func.arity()
  }

  fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> ExecResult<Value> {
    let bindings = [(Box::from("this"), self.receiver.clone()), (Box::from("This"), self.this_type.clone())];
    self.func.invoke(interp, args, &bindings)
  }
}

/// A static `func` member reached through `Struct.name` rather than an
/// instance — no receiver exists yet (that's typically what the body is
/// about to build, via `This(...)`), so only `This` is bound, never `this`.
pub struct StaticMethod {
  pub this_type: Value,
  pub func: Rc<ZoofFunction>,
}

impl Callable for StaticMethod {
  fn name(&self) -> &str {
    self.func.name()
  }

  fn arity(&self) -> usize {
    self.func.arity()
  }

  fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> ExecResult<Value> {
    let bindings = [(Box::from("This"), self.this_type.clone())];
    self.func.invoke(interp, args, &bindings)
  }
}

/// A builtin implemented in Rust (`clock`, `arbitraryNumber`).
pub struct Native {
  pub name: &'static str,
  pub arity: usize,
  pub func: fn(&mut Interpreter, Vec<Value>) -> ExecResult<Value>,
}

impl Callable for Native {
  fn name(&self) -> &str {
    self.name
  }

  fn arity(&self) -> usize {
    self.arity
  }

  fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> ExecResult<Value> {
    (self.func)(interp, args)
  }
}
