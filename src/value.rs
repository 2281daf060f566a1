//! The runtime value representation: a tagged sum over the primitives plus
//! the heap archetypes (`Struct`/`Trait`/`Impl`/`Instance`) and callables.
//!
//! Grounded on `zoofc1/interpreter.py`'s dynamically-typed values (`None`,
//! `bool`, `float`, `str`, `Callable`, `ZoofRange`) extended with the
//! struct/trait/impl machinery spec.md §4.4 describes (no Python revision in
//! `original_source/` has struct/trait/impl syntax, so that part is fresh).
//! Heap types are reference-counted (`Rc`) rather than arena-owned: the
//! interpreter's closure restriction (see `callable.rs`) removes the need
//! for a GC-style arena with back-pointers that true closures would require.

use std::rc::Rc;

use crate::archetype::{Impl, Instance, StructDef, TraitDef};
use crate::callable::Callable;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoofRange {
  pub start: f64,
  pub stop: f64,
  pub step: f64,
}

impl ZoofRange {
  pub fn new(start: f64, stop: f64, step: f64) -> Self {
    Self { start, stop, step }
  }
}

#[derive(Clone)]
pub enum Value {
  Nil,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  Callable(Rc<dyn Callable>),
  Struct(Rc<StructDef>),
  Trait(Rc<TraitDef>),
  Impl(Rc<Impl>),
  Instance(Rc<Instance>),
  Range(ZoofRange),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Nil => "Nil",
      Value::Bool(_) => "Bool",
      Value::Number(_) => "Number",
      Value::String(_) => "String",
      Value::Callable(_) => "Callable",
      Value::Struct(_) => "Struct",
      Value::Trait(_) => "Trait",
      Value::Impl(_) => "Impl",
      Value::Instance(_) => "Instance",
      Value::Range(_) => "Range",
    }
  }

  /// The spec's strict `isTruthy`: only a literal `Bool` is truthy/falsy.
  /// Anything else (including `Nil`, numbers, strings) is not a boolean and
  /// must be rejected by the caller with `E8295` rather than coerced.
  pub fn as_strict_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Value-equality rule from spec.md §3: primitives compare by value,
  /// heap archetypes and instances by identity, with `nil == nil` layered on
  /// top by simply matching that arm first.
  pub fn zoof_eq(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Nil, Value::Nil) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
      (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
      (Value::Trait(a), Value::Trait(b)) => Rc::ptr_eq(a, b),
      (Value::Impl(a), Value::Impl(b)) => Rc::ptr_eq(a, b),
      (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
      (Value::Range(a), Value::Range(b)) => a == b,
      _ => false,
    }
  }

  /// The text `print`/the REPL's trailing-value echo emit. Ported from
  /// `zoofc1/interpreter.py`'s `stringify`, except the Python reference
  /// delegates to `repr(value)` for "everything else" — which for a Python
  /// `str` would include the surrounding quotes. Zoof's `print` is meant to
  /// show a string's contents, not its syntax, so the `String` arm here
  /// intentionally diverges from a literal port of `repr()`.
  pub fn stringify(&self) -> String {
    match self {
      Value::Nil => "nil".to_string(),
      Value::Bool(true) => "true".to_string(),
      Value::Bool(false) => "false".to_string(),
      Value::Number(n) => format_number(*n),
      Value::String(s) => s.to_string(),
      Value::Callable(c) => format!("<function {}>", c.name()),
      Value::Struct(s) => format!("<struct {}>", s.name),
      Value::Trait(t) => format!("<trait {}>", t.name),
      Value::Impl(imp) => format!("<impl {} for {}>", imp.trait_name, imp.struct_name),
      Value::Instance(i) => format!("<instance of {}>", i.archetype.name),
      Value::Range(r) => format!("<range {}:{}:{}>", format_number(r.start), format_number(r.stop), format_number(r.step)),
    }
  }
}

/// Rust's `Display` for `f64` prints `11` for `11.0`, not `11.0` — unlike
/// Python's `repr(11.0)`, which the scenario outputs in spec.md §8 rely on
/// (`print 3 + 4 * 2` must show `11.0`). This appends `.0` whenever the
/// default formatting didn't already produce a fractional part.
fn format_number(n: f64) -> String {
  if n.is_nan() {
    return "nan".to_string();
  }
  if n.is_infinite() {
    return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
  }
  let s = format!("{n}");
  if s.contains('.') {
    s
  } else {
    format!("{s}.0")
  }
}

impl std::fmt::Debug for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.stringify())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nil_equals_nil() {
    assert!(Value::Nil.zoof_eq(&Value::Nil));
  }

  #[test]
  fn whole_numbers_stringify_with_trailing_zero() {
    assert_eq!(Value::Number(11.0).stringify(), "11.0");
    assert_eq!(Value::Number(0.0).stringify(), "0.0");
    assert_eq!(Value::Number(1.5).stringify(), "1.5");
  }

  #[test]
  fn strings_stringify_without_quotes() {
    assert_eq!(Value::String(Rc::from("yes")).stringify(), "yes");
  }

  #[test]
  fn instances_compare_by_identity_not_value() {
    let def = Rc::new(StructDef::new("Point", vec!["x".into()]));
    let a = Value::Instance(Rc::new(Instance::new(def.clone(), vec![Value::Number(1.0)])));
    let b = Value::Instance(Rc::new(Instance::new(def, vec![Value::Number(1.0)])));
    assert!(!a.zoof_eq(&b));
  }
}
