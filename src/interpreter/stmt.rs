//! Statement execution, ported statement-for-statement from the reference
//! `InterpreterVisitor`'s `visit*Stmt` methods (`Do`/`If`/`While`/`For`/
//! `Break`/`Return`/`Print`/`Function`), plus `Struct`/`Trait`/`Impl`, which
//! have no reference counterpart and are built from spec.md §4.4's prose.

use std::collections::HashMap;
use std::rc::Rc;

use zoof_syntax::ast::{ImplDecl, Stmt, StmtKind};

use super::{Flow, Interpreter};
use crate::archetype::{Impl, Member, StructDef, TraitDef, TraitMember};
use crate::callable::ZoofFunction;
use crate::runtime_error::{ExecResult, RuntimeError};
use crate::value::Value;

impl Interpreter {
  pub(crate) fn exec_stmt(&mut self, stmt: &Stmt<'static>) -> ExecResult<Option<Flow>> {
    match &**stmt {
      StmtKind::Do(body) => self.exec_statements(body),
      StmtKind::If(if_stmt) => {
        let cond = self.eval_expr(&if_stmt.condition)?;
        let truthy = self.require_bool(&cond, if_stmt.condition.span)?;
        if truthy {
          self.exec_statements(&if_stmt.then_branch)
        } else if let Some(else_branch) = &if_stmt.else_branch {
          self.exec_statements(else_branch)
        } else {
          Ok(None)
        }
      }
      StmtKind::While(while_stmt) => {
        self.loop_depth += 1;
        let result = (|| -> ExecResult<Option<Flow>> {
          loop {
            let cond = self.eval_expr(&while_stmt.condition)?;
            if !self.require_bool(&cond, while_stmt.condition.span)? {
              return Ok(None);
            }
            match self.exec_statements(&while_stmt.body)? {
              Some(Flow::Break) => return Ok(None),
              Some(flow @ Flow::Return(_)) => return Ok(Some(flow)),
              None => {}
            }
          }
        })();
        self.loop_depth -= 1;
        result
      }
      StmtKind::For(for_stmt) => {
        let iterable = self.eval_expr(&for_stmt.iterable)?;
        let range = match iterable {
          Value::Range(r) => r,
          other => {
            return Err(RuntimeError::new(
              "E8230",
              for_stmt.iterable.span,
              format!("Cannot iterate over a value of type {}.", other.type_name()),
              "`for` only accepts a `Range` value, such as `0:10` or `0:10:2`.",
            ));
          }
        };
        self.loop_depth += 1;
        let var_name: &str = &for_stmt.variable;
        let result = (|| -> ExecResult<Option<Flow>> {
          let mut value = range.start;
          while value < range.stop {
            self.env.define(var_name, Value::Number(value));
            match self.exec_statements(&for_stmt.body)? {
              Some(Flow::Break) => return Ok(None),
              Some(flow @ Flow::Return(_)) => return Ok(Some(flow)),
              None => {}
            }
            value += range.step;
          }
          Ok(None)
        })();
        self.loop_depth -= 1;
        result
      }
      StmtKind::Break => {
        if self.loop_depth == 0 {
          return Err(RuntimeError::new(
            "E8311",
            stmt.span,
            "`break` used outside of a loop.",
            "`break` can only appear inside the body of a `for` or `while` loop.",
          ));
        }
        Ok(Some(Flow::Break))
      }
      StmtKind::Return(value) => {
        let value = match value {
          Some(expr) => self.eval_expr(expr)?,
          None => Value::Nil,
        };
        Ok(Some(Flow::Return(value)))
      }
      StmtKind::Print(expr) => {
        let value = self.eval_expr(expr)?;
        let text = value.stringify();
        self.sink.print_line(&text);
        Ok(None)
      }
      StmtKind::Function(decl) => {
        let func = Rc::new(ZoofFunction::new(Rc::new((**decl).clone()), self.env.clone()));
        if let Some(name) = &decl.name {
          self.env.define(&**name, Value::Callable(func.clone()));
        }
        self.track_nested_function(&func);
        Ok(None)
      }
      StmtKind::Struct(decl) => {
        let fields: Vec<Box<str>> = decl.fields.iter().map(|f| Box::<str>::from(&**f.name)).collect();
        let def = Rc::new(StructDef::new(Box::<str>::from(&**decl.name), fields));
        self.env.define(&**decl.name, Value::Struct(def));
        Ok(None)
      }
      StmtKind::Trait(decl) => {
        let members = decl
          .members
          .iter()
          .map(|m| {
            let default = if m.is_abstract {
              None
            } else {
              Some(Rc::new(ZoofFunction::new(Rc::new(m.clone()), self.env.clone())))
            };
            TraitMember {
              kind: m.kind,
              name: m.name.as_ref().map(|n| Box::<str>::from(&**n)).unwrap_or_default(),
              default,
            }
          })
          .collect();
        let def = Rc::new(TraitDef {
          name: Box::<str>::from(&**decl.name),
          members,
          implementations: std::cell::RefCell::new(HashMap::new()),
        });
        self.env.define(&**decl.name, Value::Trait(def));
        Ok(None)
      }
      StmtKind::Impl(decl) => {
        self.exec_impl(decl, stmt.span)?;
        Ok(None)
      }
      StmtKind::Expression(expr) => {
        self.eval_expr(expr)?;
        Ok(None)
      }
    }
  }

  fn exec_impl(&mut self, decl: &ImplDecl<'static>, span: zoof_span::Span) -> ExecResult<()> {
    let struct_value = self.lookup_name(&decl.struct_name, decl.struct_name.span)?;
    let def = match struct_value {
      Value::Struct(def) => def,
      _ => {
        return Err(RuntimeError::new(
          "E8231",
          decl.struct_name.span,
          format!("`{}` is not a struct.", decl.struct_name),
          "Only a name bound to a `struct` can appear after `impl ... for`.",
        ));
      }
    };

    let mut installed: HashMap<String, Member> = HashMap::new();
    for member in &decl.members {
      let Some(name) = &member.name else { continue };
      let func = Rc::new(ZoofFunction::new(Rc::new(member.clone()), self.env.clone()));
      installed.insert(name.to_string(), Member { kind: member.kind, func });
    }

    if let Some(trait_name) = &decl.trait_name {
      let trait_value = self.lookup_name(trait_name, trait_name.span)?;
      let trait_def = match trait_value {
        Value::Trait(def) => def,
        _ => {
          return Err(RuntimeError::new(
            "E8232",
            trait_name.span,
            format!("`{}` is not a trait.", trait_name),
            "Only a name bound to a `trait` can appear after `impl`.",
          ));
        }
      };

      let mut merged: HashMap<String, Member> = HashMap::new();
      for trait_member in &trait_def.members {
        let name = trait_member.name.to_string();
        if let Some(member) = installed.remove(&name) {
          merged.insert(name, member);
        } else if let Some(default) = &trait_member.default {
          merged.insert(
            name,
            Member {
              kind: trait_member.kind,
              func: default.clone(),
            },
          );
        } else {
          return Err(RuntimeError::new(
            "E8233",
            span,
            format!("`{}` does not implement `{}`'s abstract member `{}`.", decl.struct_name, trait_def.name, trait_member.name),
            "Every abstract member of a trait must be given a body in the `impl ... for ...` block that implements it.",
          ));
        }
      }
      // Any member the impl declares beyond the trait's own list (a helper
      // method not part of the trait's contract) is still installed.
      merged.extend(installed);

      for (name, member) in &merged {
        def.install(name.clone(), member.clone());
      }
      let impl_obj = Rc::new(Impl {
        trait_name: Box::<str>::from(&**trait_name),
        struct_name: Box::<str>::from(&**decl.struct_name),
        members: merged,
      });
      trait_def.implementations.borrow_mut().insert(decl.struct_name.to_string(), impl_obj);
    } else {
      for (name, member) in installed {
        def.install(name, member);
      }
    }

    Ok(())
  }
}
