//! The two builtins `zoofc1/interpreter.py`'s `BUILTINS` dict installs into
//! every global environment: `clock()` and `arbitraryNumber()`.

use std::sync::OnceLock;
use std::time::Instant;

use crate::callable::Native;
use crate::interpreter::Interpreter;
use crate::runtime_error::ExecResult;
use crate::value::Value;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Seconds since the interpreter process started, as an `f64`. The Python
/// reference uses `time.time()` (wall clock); `Instant` is used here instead
/// since Rust's `SystemTime` has no infallible `f64`-seconds conversion and
/// the scenarios in spec.md §8 only ever check that the value moves forward.
fn clock(_interp: &mut Interpreter, _args: Vec<Value>) -> ExecResult<Value> {
  let start = PROCESS_START.get_or_init(Instant::now);
  Ok(Value::Number(start.elapsed().as_secs_f64()))
}

fn arbitrary_number(_interp: &mut Interpreter, _args: Vec<Value>) -> ExecResult<Value> {
  Ok(Value::Number(7.0))
}

pub const NAMES: &[&str] = &["clock", "arbitraryNumber"];

pub fn bindings() -> Vec<(&'static str, Value)> {
  vec![
    (
      "clock",
      Value::Callable(std::rc::Rc::new(Native {
        name: "clock",
        arity: 0,
        func: clock,
      })),
    ),
    (
      "arbitraryNumber",
      Value::Callable(std::rc::Rc::new(Native {
        name: "arbitraryNumber",
        arity: 0,
        func: arbitrary_number,
      })),
    ),
  ]
}
