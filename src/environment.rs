//! Lexical environments, chained by `Rc` exactly like the reference
//! `Environment` in `zoofc1/interpreter.py`. `index` mirrors the resolver's
//! scope depth (0 = builtins, 1 = module globals, 2+ = one per active call)
//! so `Interpreter::lookup` can walk straight to the scope a `VariableRef`
//! was resolved against instead of searching.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

pub struct Environment {
  parent: Option<Rc<Environment>>,
  index: i32,
  bindings: RefCell<IndexMap<Box<str>, Value>>,
}

impl Environment {
  pub fn root(builtins: impl IntoIterator<Item = (&'static str, Value)>) -> Rc<Self> {
    let env = Rc::new(Self {
      parent: None,
      index: 0,
      bindings: RefCell::new(IndexMap::new()),
    });
    for (name, value) in builtins {
      env.define(name, value);
    }
    env
  }

  pub fn child(parent: &Rc<Self>) -> Rc<Self> {
    Rc::new(Self {
      parent: Some(parent.clone()),
      index: parent.index + 1,
      bindings: RefCell::new(IndexMap::new()),
    })
  }

  pub fn index(&self) -> i32 {
    self.index
  }

  pub fn define(&self, name: &str, value: Value) {
    self.bindings.borrow_mut().insert(name.into(), value);
  }

  pub fn has_local(&self, name: &str) -> bool {
    self.bindings.borrow().contains_key(name)
  }

  pub fn get_local(&self, name: &str) -> Option<Value> {
    self.bindings.borrow().get(name).cloned()
  }

  /// Every name currently bound directly in this scope, in no particular
  /// order. Used only to let a REPL session re-declare its module scope's
  /// accumulated names to the resolver before each new line, since a fresh
  /// `resolve()` pass otherwise has no memory of names earlier lines
  /// defined.
  pub fn bound_names(&self) -> Vec<String> {
    self.bindings.borrow().keys().map(|k| k.to_string()).collect()
  }

  /// Walks up the chain to the environment whose `index` matches `depth`,
  /// the scope the resolver recorded on the `VariableRef`/`AssignExpr` being
  /// evaluated. Panics if `depth` is negative or deeper than the chain: both
  /// would mean the resolver either failed to run or disagreed with the
  /// interpreter about how many scopes a call pushes, which is a bug in this
  /// crate rather than a condition a running program can trigger.
  pub fn ancestor(self: &Rc<Self>, depth: i32) -> Rc<Self> {
    let mut env = self.clone();
    while env.index > depth {
      env = env.parent.clone().expect("environment chain shorter than resolved depth");
    }
    env
  }

  /// Walks up the chain searching by name rather than by resolved depth, for
  /// the handful of lookups the resolver never assigns a depth to: a
  /// `struct`/`trait` name after `impl ... for`, and the active `this`/`This`
  /// binding consulted by the `..`-access privacy check. Both are dynamic by
  /// construction, since `resolver.rs` never calls `resolve_local`/`declare`
  /// on an `ImplDecl`'s `struct_name`/`trait_name`.
  pub fn lookup_name(self: &Rc<Self>, name: &str) -> Option<Value> {
    let mut env = Some(self.clone());
    while let Some(current) = env {
      if let Some(value) = current.get_local(name) {
        return Some(value);
      }
      env = current.parent.clone();
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn child_index_is_parent_plus_one() {
    let root = Environment::root(std::iter::empty());
    let child = Environment::child(&root);
    assert_eq!(root.index(), 0);
    assert_eq!(child.index(), 1);
  }

  #[test]
  fn ancestor_walks_to_matching_depth() {
    let root = Environment::root(std::iter::empty());
    root.define("x", Value::Number(1.0));
    let mid = Environment::child(&root);
    let leaf = Environment::child(&mid);
    let found = leaf.ancestor(0);
    assert_eq!(found.get_local("x").unwrap().stringify(), "1.0");
  }

  #[test]
  fn define_shadows_within_same_scope() {
    let root = Environment::root(std::iter::empty());
    root.define("x", Value::Number(1.0));
    root.define("x", Value::Number(2.0));
    assert_eq!(root.get_local("x").unwrap().stringify(), "2.0");
  }
}
