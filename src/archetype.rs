//! Runtime archetypes: `Struct`, `Trait`, `Impl`, and the `Instance`s a
//! struct produces. None of this has a counterpart in any retrieved
//! `original_source/` revision (struct/trait/impl syntax postdates every
//! kept Python revision), so the shapes here are built directly from
//! spec.md §4.4's prose rather than ported.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use zoof_syntax::ast::FuncKind;

use crate::callable::ZoofFunction;
use crate::value::Value;

/// A struct's (or trait's) `func`/`method`/`getter`/`setter` dispatch table
/// entry. `kind` decides how a `Get` expression uses it: a `Getter` is
/// invoked immediately with no arguments, a `Method` is bound to its
/// receiver and returned as a callable, a plain `Func` declared inside an
/// `impl` is reached only through the struct itself, never an instance.
#[derive(Clone)]
pub struct Member {
  pub kind: FuncKind,
  pub func: Rc<ZoofFunction>,
}

/// A struct archetype: its declared fields plus the dispatch table built up
/// by its `impl` block(s). `RefCell` because `impl` statements mutate this
/// table *after* the `struct` statement that created it has already bound
/// the struct's name in the environment.
pub struct StructDef {
  pub name: Box<str>,
  pub fields: Vec<Box<str>>,
  pub members: RefCell<HashMap<String, Member>>,
}

impl StructDef {
  pub fn new(name: impl Into<Box<str>>, fields: Vec<Box<str>>) -> Self {
    Self {
      name: name.into(),
      fields,
      members: RefCell::new(HashMap::new()),
    }
  }

  pub fn install(&self, name: String, member: Member) {
    self.members.borrow_mut().insert(name, member);
  }

  pub fn lookup(&self, name: &str) -> Option<Member> {
    self.members.borrow().get(name).cloned()
  }
}

impl std::fmt::Debug for StructDef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StructDef").field("name", &self.name).field("fields", &self.fields).finish()
  }
}

#[derive(Clone)]
pub struct TraitMember {
  pub kind: FuncKind,
  pub name: Box<str>,
  /// `None` for an abstract member — a struct implementing this trait must
  /// supply its own body in the corresponding `impl Trait for Struct` block.
  pub default: Option<Rc<ZoofFunction>>,
}

pub struct TraitDef {
  pub name: Box<str>,
  pub members: Vec<TraitMember>,
  /// Structs that have implemented this trait, recorded as
  /// `trait.implementations[struct]` per spec.md §4.4.
  pub implementations: RefCell<HashMap<String, Rc<Impl>>>,
}

impl TraitDef {
  pub fn member(&self, name: &str) -> Option<&TraitMember> {
    self.members.iter().find(|m| &*m.name == name)
  }
}

/// The installation of a trait's operations onto a specific struct, merged
/// with any methods the struct's own `impl` blocks declare (glossary:
/// "Impl").
pub struct Impl {
  pub trait_name: Box<str>,
  pub struct_name: Box<str>,
  pub members: HashMap<String, Member>,
}

/// A per-object record: its struct archetype plus its field data.
pub struct Instance {
  pub archetype: Rc<StructDef>,
  pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
  /// Zips `values` positionally against the archetype's declared field
  /// names, per spec.md §4.4's construction rule.
  pub fn new(archetype: Rc<StructDef>, values: Vec<Value>) -> Self {
    let mut fields = HashMap::new();
    for (name, value) in archetype.fields.iter().zip(values) {
      fields.insert(name.to_string(), value);
    }
    Self {
      archetype,
      fields: RefCell::new(fields),
    }
  }

  pub fn get_field(&self, name: &str) -> Option<Value> {
    self.fields.borrow().get(name).cloned()
  }

  pub fn set_field(&self, name: &str, value: Value) {
    self.fields.borrow_mut().insert(name.to_string(), value);
  }
}
