//! Expression evaluation, ported from the reference `InterpreterVisitor`'s
//! `visit*Expr` methods. Where the reference coerces or special-cases, this
//! stays strict per spec.md §4.4: no truthy coercion, arithmetic closed over
//! `Number` only (plus `+` on two `String`s), and member access split
//! exactly along the `.`/`..` line the grammar draws.

use std::rc::Rc;

use zoof_syntax::ast::{Access, BinaryOp, Expr, ExprKind, FuncKind, Literal, LogicalOp, UnaryOp};

use super::Interpreter;
use crate::archetype::Instance;
use crate::callable::{BoundMethod, Callable, StaticMethod, ZoofFunction};
use crate::runtime_error::{ExecResult, RuntimeError};
use crate::value::{Value, ZoofRange};

impl Interpreter {
  pub(crate) fn eval_expr(&mut self, expr: &Expr<'static>) -> ExecResult<Value> {
    match &**expr {
      ExprKind::Literal(lit) => Ok(self.eval_literal(lit)),
      ExprKind::Variable(var) => {
        let env = self.env.ancestor(var.depth.get());
        env.get_local(&var.name).ok_or_else(|| {
          RuntimeError::new(
            "E8201",
            var.name.span,
            format!("Undefined name `{}`.", var.name),
            "The resolver should have caught this; report it as a bug.",
          )
        })
      }
      ExprKind::Assign(assign) => {
        let value = self.eval_expr(&assign.value)?;
        self.env.define(&assign.name, value.clone());
        Ok(value)
      }
      ExprKind::Unary(op, operand) => {
        let value = self.eval_expr(operand)?;
        let n = self.require_number(&value, operand.span)?;
        Ok(Value::Number(match op {
          UnaryOp::Neg => -n,
          UnaryOp::Pos => n,
        }))
      }
      ExprKind::Binary(bin) => self.eval_binary(bin),
      ExprKind::Logical(logical) => self.eval_logical(logical),
      ExprKind::Grouping(inner) => self.eval_expr(inner),
      ExprKind::Range(range) => self.eval_range(range),
      ExprKind::Call(call) => self.eval_call(call),
      ExprKind::Get(get) => self.eval_get(get),
      ExprKind::Set(set) => self.eval_set(set),
      ExprKind::If(if_expr) => {
        let cond = self.eval_expr(&if_expr.condition)?;
        let truthy = self.require_bool(&cond, if_expr.condition.span)?;
        if truthy {
          self.eval_expr(&if_expr.then_branch)
        } else {
          self.eval_expr(&if_expr.else_branch)
        }
      }
      ExprKind::Function(decl) => {
        let func = Rc::new(ZoofFunction::new(Rc::new((**decl).clone()), self.env.clone()));
        self.track_nested_function(&func);
        Ok(Value::Callable(func))
      }
    }
  }

  fn eval_literal(&self, lit: &Literal<'static>) -> Value {
    match lit {
      Literal::Nil => Value::Nil,
      Literal::Bool(b) => Value::Bool(*b),
      Literal::Number(n) => Value::Number(*n),
      Literal::String(s) => Value::String(Rc::from(&**s)),
    }
  }

  fn require_number(&self, value: &Value, span: zoof_span::Span) -> ExecResult<f64> {
    match value {
      Value::Number(n) => Ok(*n),
      other => Err(RuntimeError::new(
        "E8210",
        span,
        format!("Cannot convert {} to Number.", other.type_name()),
        "This operator requires a `Number` operand.",
      )),
    }
  }

  fn eval_binary(&mut self, bin: &zoof_syntax::ast::BinaryExpr<'static>) -> ExecResult<Value> {
    let left = self.eval_expr(&bin.left)?;

    if matches!(bin.op, BinaryOp::Eq | BinaryOp::Ne) {
      let right = self.eval_expr(&bin.right)?;
      let eq = left.zoof_eq(&right);
      return Ok(Value::Bool(if bin.op == BinaryOp::Eq { eq } else { !eq }));
    }

    let right = self.eval_expr(&bin.right)?;

    if bin.op == BinaryOp::Add {
      return match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(Rc::from(format!("{a}{b}")))),
        _ => Err(RuntimeError::new(
          "E8212",
          bin.left.span.join(bin.right.span),
          format!("Cannot add {} and {}.", left.type_name(), right.type_name()),
          "`+` only accepts two `Number`s or two `String`s.",
        )),
      };
    }

    if matches!(bin.op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge) {
      let a = self.require_comparable(&left, bin.left.span)?;
      let b = self.require_comparable(&right, bin.right.span)?;
      let result = match bin.op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
      };
      return Ok(Value::Bool(result));
    }

    let a = self.require_number(&left, bin.left.span)?;
    let b = self.require_number(&right, bin.right.span)?;
    Ok(Value::Number(match bin.op {
      BinaryOp::Sub => a - b,
      BinaryOp::Mul => a * b,
      BinaryOp::Div => a / b,
      BinaryOp::Pow => a.powf(b),
      _ => unreachable!("handled above"),
    }))
  }

  fn require_comparable(&self, value: &Value, span: zoof_span::Span) -> ExecResult<f64> {
    match value {
      Value::Number(n) => Ok(*n),
      other => Err(RuntimeError::new(
        "E8213",
        span,
        format!("Cannot compare a value of type {}.", other.type_name()),
        "`<`, `<=`, `>` and `>=` only accept `Number` operands.",
      )),
    }
  }

  fn eval_logical(&mut self, logical: &zoof_syntax::ast::LogicalExpr<'static>) -> ExecResult<Value> {
    let left = self.eval_expr(&logical.left)?;
    let left_bool = self.require_bool(&left, logical.left.span)?;
    match logical.op {
      LogicalOp::Or if left_bool => Ok(Value::Bool(true)),
      LogicalOp::And if !left_bool => Ok(Value::Bool(false)),
      _ => {
        let right = self.eval_expr(&logical.right)?;
        let right_bool = self.require_bool(&right, logical.right.span)?;
        Ok(Value::Bool(right_bool))
      }
    }
  }

  fn eval_range(&mut self, range: &zoof_syntax::ast::RangeExpr<'static>) -> ExecResult<Value> {
    let start_value = self.eval_expr(&range.start)?;
    let start = self.require_number(&start_value, range.start.span)?;
    let stop_value = self.eval_expr(&range.stop)?;
    let stop = self.require_number(&stop_value, range.stop.span)?;
    let step = match &range.step {
      Some(step_expr) => {
        let step_value = self.eval_expr(step_expr)?;
        self.require_number(&step_value, step_expr.span)?
      }
      None => 1.0,
    };
    if step <= 0.0 {
      return Err(RuntimeError::new(
        "E8222",
        range.step.as_ref().map(|s| s.span).unwrap_or(range.start.span.join(range.stop.span)),
        "A range's step must be greater than zero.",
        "`start:stop:step` always counts upward; a zero or negative step would never terminate or go the wrong way.",
      ));
    }
    Ok(Value::Range(ZoofRange::new(start, stop, step)))
  }

  fn eval_call(&mut self, call: &zoof_syntax::ast::CallExpr<'static>) -> ExecResult<Value> {
    let callee = self.eval_expr(&call.callee)?;
    let mut args = Vec::with_capacity(call.arguments.len());
    for arg in &call.arguments {
      args.push(self.eval_expr(arg)?);
    }

    if let Value::Struct(def) = &callee {
      if !self.this_matches(def) {
        return Err(RuntimeError::new(
          "E8235",
          call.callee.span,
          format!("`{}` can only be constructed from inside its own `impl`, through the `This` binding.", def.name),
          "A struct is callable as a constructor only where `This` is bound to it — call a static `func` on the struct instead.",
        ));
      }
      if args.len() != def.fields.len() {
        return Err(RuntimeError::new(
          "E8234",
          call.callee.span,
          format!("`{}` takes {} field value(s), found {}.", def.name, def.fields.len(), args.len()),
          "Calling a struct directly constructs an instance, zipping arguments positionally onto its declared fields.",
        ));
      }
      return Ok(Value::Instance(Rc::new(Instance::new(def.clone(), args))));
    }

    let Value::Callable(callable) = &callee else {
      return Err(RuntimeError::new(
        "E8220",
        call.callee.span,
        format!("{} is not callable.", callee.type_name()),
        "Only a function, method, or struct can appear before `(...)`.",
      ));
    };

    if args.len() != callable.arity() {
      return Err(RuntimeError::new(
        "E8221",
        call.callee.span,
        format!("`{}` expects {} argument(s), found {}.", callable.name(), callable.arity(), args.len()),
        "The number of arguments in a call must match the number of declared parameters exactly.",
      ));
    }

    callable.call(self, args)
  }

  /// Whether the interpreter is currently inside a method/getter/setter body
  /// of `archetype`'s own struct — the privacy gate for `..` field access.
  fn this_matches(&self, archetype: &Rc<crate::archetype::StructDef>) -> bool {
    match self.env.lookup_name("This") {
      Some(Value::Struct(this_def)) => Rc::ptr_eq(&this_def, archetype),
      _ => false,
    }
  }

  fn eval_get(&mut self, get: &zoof_syntax::ast::GetExpr<'static>) -> ExecResult<Value> {
    let object = self.eval_expr(&get.object)?;
    match (&object, get.access) {
      (Value::Struct(def), Access::Dot) => {
        let member = def.lookup(&get.name).ok_or_else(|| undefined_member(&get.name, def.name.as_ref(), get.name.span))?;
        Ok(Value::Callable(Rc::new(StaticMethod {
          this_type: Value::Struct(def.clone()),
          func: member.func,
        })))
      }
      (Value::Struct(def), Access::DotDot) => Err(RuntimeError::new(
        "E8240",
        get.name.span,
        format!("`{}` is a struct, not an instance — it has no data fields of its own.", def.name),
        "`..` reaches an instance's field data; use `.` to reach a struct's static functions.",
      )),
      (Value::Instance(instance), Access::Dot) => {
        let member = instance
          .archetype
          .lookup(&get.name)
          .ok_or_else(|| undefined_member(&get.name, instance.archetype.name.as_ref(), get.name.span))?;
        match member.kind {
          FuncKind::Getter => member.func.invoke(
            self,
            Vec::new(),
            &[(Box::from("this"), object.clone()), (Box::from("This"), Value::Struct(instance.archetype.clone()))],
          ),
          FuncKind::Method | FuncKind::Setter => Ok(Value::Callable(Rc::new(BoundMethod {
            receiver: object.clone(),
            this_type: Value::Struct(instance.archetype.clone()),
            func: member.func,
          }))),
          FuncKind::Func => Err(RuntimeError::new(
            "E8244",
            get.name.span,
            format!("`{}` is only reachable through the struct `{}`, not an instance.", get.name, instance.archetype.name),
            "A plain `func` declared in an `impl` block is a static function, not a method.",
          )),
        }
      }
      (Value::Instance(instance), Access::DotDot) => {
        if !self.this_matches(&instance.archetype) {
          return Err(RuntimeError::new(
            "E8242",
            get.name.span,
            format!("`..{}` can only be used from within a method of `{}`.", get.name, instance.archetype.name),
            "`..` grants direct access to a struct's data fields, but only to its own methods — everywhere else, go through `.`.",
          ));
        }
        instance.get_field(&get.name).ok_or_else(|| undefined_member(&get.name, instance.archetype.name.as_ref(), get.name.span))
      }
      _ => Err(RuntimeError::new(
        "E8240",
        get.object.span,
        format!("Cannot access a member of a value of type {}.", object.type_name()),
        "Only a `Struct` (via `.`) or an `Instance` (via `.` or `..`) has members to access.",
      )),
    }
  }

  fn eval_set(&mut self, set: &zoof_syntax::ast::SetExpr<'static>) -> ExecResult<Value> {
    let object = self.eval_expr(&set.object)?;
    let value = self.eval_expr(&set.value)?;
    match (&object, set.access) {
      (Value::Instance(instance), Access::Dot) => {
        let member = instance
          .archetype
          .lookup(&set.name)
          .ok_or_else(|| undefined_member(&set.name, instance.archetype.name.as_ref(), set.name.span))?;
        if member.kind != FuncKind::Setter {
          return Err(RuntimeError::new(
            "E8243",
            set.name.span,
            format!("`{}` is not a setter on `{}`.", set.name, instance.archetype.name),
            "Assigning through `.` dispatches to a `setter` member; declare one to support this.",
          ));
        }
        let bindings = [(Box::from("this"), object.clone()), (Box::from("This"), Value::Struct(instance.archetype.clone()))];
        member.func.invoke(self, vec![value.clone()], &bindings)?;
        Ok(value)
      }
      (Value::Instance(instance), Access::DotDot) => {
        if !self.this_matches(&instance.archetype) {
          return Err(RuntimeError::new(
            "E8242",
            set.name.span,
            format!("`..{}` can only be used from within a method of `{}`.", set.name, instance.archetype.name),
            "`..` grants direct access to a struct's data fields, but only to its own methods — everywhere else, go through `.`.",
          ));
        }
        instance.set_field(&set.name, value.clone());
        Ok(value)
      }
      _ => Err(RuntimeError::new(
        "E8243",
        set.object.span,
        format!("Cannot set a member on a value of type {}.", object.type_name()),
        "Only an `Instance`'s fields (via `..`) or setter methods (via `.`) can be assigned to.",
      )),
    }
  }
}

fn undefined_member(name: &zoof_syntax::ast::Ident<'static>, owner: &str, span: zoof_span::Span) -> RuntimeError {
  RuntimeError::new(
    "E8241",
    span,
    format!("`{owner}` has no member named `{name}`."),
    "Check the struct's field declarations and its `impl` block(s) for the exact name.",
  )
}

#[cfg(test)]
mod tests {
  use zoof_resolve::resolve;
  use zoof_syntax::parser::parse;

  use super::*;
  use crate::interpreter::Sink;

  fn run(src: &'static str) -> Vec<String> {
    let (program, parse_errors) = parse(src);
    assert!(parse_errors.is_empty(), "{parse_errors:?}");
    let source = zoof_diag::Source::new("<test>", src);
    let errors = resolve(&program, &source, crate::builtins::NAMES);
    assert!(errors.is_empty(), "{errors:?}");
    let lines = Rc::new(std::cell::RefCell::new(Vec::new()));
    struct Capture(Rc<std::cell::RefCell<Vec<String>>>);
    impl Sink for Capture {
      fn print_line(&mut self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
      }
    }
    let mut interp = Interpreter::new(Box::new(Capture(lines.clone())));
    interp.interpret(&program).unwrap();
    let out = lines.borrow().clone();
    out
  }

  #[test]
  fn arithmetic_and_printing() {
    assert_eq!(run("print 3 + 4 * 2\n"), vec!["11.0"]);
  }

  #[test]
  fn assignment_and_variable() {
    assert_eq!(run("a = 10\nb = a + 5\nprint b\n"), vec!["15.0"]);
  }

  #[test]
  fn if_statement_with_bool_condition() {
    assert_eq!(run("if 1 == 1 do\n    print 'yes'\nelse\n    print 'no'\n"), vec!["yes"]);
  }

  #[test]
  fn if_expression_form() {
    assert_eq!(run("print if 2 < 3 its 'a' else 'b'\n"), vec!["a"]);
  }

  #[test]
  fn for_loop_over_range() {
    assert_eq!(run("for i in 0:3 do\n    print i\n"), vec!["0.0", "1.0", "2.0"]);
  }

  #[test]
  fn mutual_recursion_through_calls() {
    let src = "func foo() do\n    return bar()\nfunc bar() do\n    return 42\nprint foo()\n";
    assert_eq!(run(src), vec!["42.0"]);
  }

  #[test]
  fn non_bool_if_condition_is_a_runtime_error() {
    let (program, parse_errors) = parse("if 1 do\n    print 'x'\n");
    assert!(parse_errors.is_empty());
    let source = zoof_diag::Source::new("<test>", "if 1 do\n    print 'x'\n");
    assert!(resolve(&program, &source, crate::builtins::NAMES).is_empty());
    let mut interp = Interpreter::new(Box::new(crate::interpreter::StdoutSink));
    let err = interp.interpret(&program).unwrap_err();
    assert_eq!(err.code, "E8295");
  }

  #[test]
  fn struct_impl_getter_dispatch() {
    let src = "struct Vector\n    x num\n    y num\n\nimpl Vector\n    func new(x, y) its This(x, y)\n    getter length() its (this..x ^ 2 + this..y ^ 2) ^ 0.5\n\nv = Vector.new(3, 4)\nprint v.length\n";
    assert_eq!(run(src), vec!["5.0"]);
  }

  #[test]
  fn field_privacy_blocks_outside_access() {
    let src = "struct Point\n    x num\n\nimpl Point\n    func new(x) its This(x)\n\np = Point.new(1)\nprint p..x\n";
    let (program, parse_errors) = parse(src);
    assert!(parse_errors.is_empty());
    let source = zoof_diag::Source::new("<test>", src);
    assert!(resolve(&program, &source, crate::builtins::NAMES).is_empty());
    let mut interp = Interpreter::new(Box::new(crate::interpreter::StdoutSink));
    let err = interp.interpret(&program).unwrap_err();
    assert_eq!(err.code, "E8242");
  }

  #[test]
  fn struct_is_not_callable_outside_its_own_impl() {
    let src = "struct Point\n    x num\n\nimpl Point\n    func new(x) its This(x)\n\np = Point(1)\n";
    let (program, parse_errors) = parse(src);
    assert!(parse_errors.is_empty());
    let source = zoof_diag::Source::new("<test>", src);
    assert!(resolve(&program, &source, crate::builtins::NAMES).is_empty());
    let mut interp = Interpreter::new(Box::new(crate::interpreter::StdoutSink));
    let err = interp.interpret(&program).unwrap_err();
    assert_eq!(err.code, "E8235");
  }
}
