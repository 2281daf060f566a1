//! Scope-stack resolver, ported from the reference `ResolverVisitor`: each
//! scope tracks declared names and the free variables read from it, function
//! bodies are resolved lazily (on call-by-name or scope exit) so sibling
//! functions in one block can call each other without forward declarations,
//! and `impl` member bodies get synthetic `this`/`This` bindings.

use std::collections::HashMap;
use std::collections::HashSet;

use zoof_diag::{Loc, Source};
use zoof_syntax::ast::*;

use crate::error::Error;

struct Scope<'src> {
  declared: HashSet<String>,
  /// Names read in this scope that resolved to an outer scope, keyed by
  /// name, recording the `VariableRef` of the first such read (its `depth`
  /// cell is read back once the scope ends to split real frees from
  /// builtins/globals).
  free_vars: HashMap<String, VariableRef<'src>>,
}

impl<'src> Scope<'src> {
  fn new() -> Self {
    Self {
      declared: HashSet::new(),
      free_vars: HashMap::new(),
    }
  }

  fn with_names(names: impl IntoIterator<Item = String>) -> Self {
    Self {
      declared: names.into_iter().collect(),
      free_vars: HashMap::new(),
    }
  }

  fn contains(&self, name: &str) -> bool {
    self.declared.contains(name)
  }
}

pub struct Resolver<'ast, 'src> {
  scopes: Vec<Scope<'src>>,
  /// Function bodies declared but not yet walked, keyed by name. Shared
  /// across all active scopes exactly like the reference resolver's single
  /// `unresolvedFunctions` dict: draining happens on every scope exit, not
  /// only the scope that declared the function.
  unresolved: HashMap<String, &'ast FunctionDecl<'src>>,
  errors: Vec<Error>,
  source: &'ast Source,
}

impl<'ast, 'src> Resolver<'ast, 'src> {
  pub fn new(source: &'ast Source, builtin_names: &[&str]) -> Self {
    Self {
      scopes: vec![Scope::with_names(builtin_names.iter().map(|s| s.to_string()))],
      unresolved: HashMap::new(),
      errors: Vec::new(),
      source,
    }
  }

  pub fn resolve_program(mut self, program: &'ast Program<'src>) -> Vec<Error> {
    self.begin_scope();
    self.resolve_statements(&program.statements);
    self.end_scope();
    self.errors
  }

  /// Like [`resolve_program`](Self::resolve_program), but the module scope
  /// starts pre-declared with `module_names` instead of empty. A REPL
  /// resolves each line as its own fresh `Program`, so without this, a name
  /// an earlier line defined at module scope would look undefined to every
  /// later line's resolve pass even though the interpreter's global
  /// environment still holds it.
  pub fn resolve_repl_line(mut self, program: &'ast Program<'src>, module_names: &[&str]) -> Vec<Error> {
    self.begin_scope();
    self.scopes.last_mut().unwrap().declared.extend(module_names.iter().map(|s| s.to_string()));
    self.resolve_statements(&program.statements);
    self.end_scope();
    self.errors
  }

  fn loc(&self, span: zoof_span::Span) -> (Loc, Loc) {
    let (l1, c1) = self.source.locate(span.start);
    let (l2, c2) = self.source.locate(span.end);
    (Loc::new(l1, c1), Loc::new(l2, c2))
  }

  fn error(&mut self, span: zoof_span::Span, code: &'static str, message: impl Into<String>, explanation: impl Into<String>) {
    let (start, end) = self.loc(span);
    self.errors.push(Error::new(code, message, start, end, explanation));
  }

  fn begin_scope(&mut self) {
    self.scopes.push(Scope::new());
  }

  /// Drains every still-unresolved function body, then pops the scope.
  /// Matches the reference `endScope`, which drains the *entire* pending
  /// set on every scope exit rather than only the functions declared in
  /// the scope being closed.
  fn end_scope(&mut self) {
    let names: Vec<String> = self.unresolved.keys().cloned().collect();
    for name in names {
      self.check_function(&name);
    }
    debug_assert!(self.unresolved.is_empty());
    self.scopes.pop();
  }

  fn declare(&mut self, name: &Ident<'src>) {
    let lexeme = (&**name).to_string();
    if let Some(prior) = self.scopes.last().unwrap().free_vars.get(&lexeme) {
      let span = prior.name.span;
      self.error(
        span,
        "E2001",
        "Variable is used before it's defined in this scope.",
        "A name can't be read from an enclosing scope in the same block where it is later declared locally.",
      );
    }
    self.scopes.last_mut().unwrap().declared.insert(lexeme);
  }

  fn resolve_local(&mut self, var: &VariableRef<'src>) {
    let lexeme: &str = &var.name;
    let mut found = -1i32;
    for (depth, scope) in self.scopes.iter().enumerate() {
      if scope.contains(lexeme) {
        found = depth as i32;
      }
    }
    var.depth.set(found);
    if found < 0 {
      self.error(var.name.span, "E2002", format!("Undefined variable `{lexeme}`."), "Every name must be assigned before it is read.");
      return;
    }
    let current_depth = self.scopes.len() as i32 - 1;
    if found != current_depth {
      let scope = self.scopes.last_mut().unwrap();
      scope.free_vars.entry(lexeme.to_string()).or_insert_with(|| var.clone());
    }
  }

  fn check_function(&mut self, name: &str) {
    let Some(decl) = self.unresolved.remove(name) else {
      return;
    };
    self.resolve_function_body(&decl.params, &decl.body, false, &decl.free_vars);
  }

  /// Resolves a function/method body in its own scope, optionally binding
  /// `this`/`This` for impl and trait members, and records the resulting
  /// free variables (depth >= 1) onto `slot`.
  fn resolve_function_body(&mut self, params: &[Ident<'src>], body: &FuncBody<'src>, bind_this: bool, slot: &std::cell::RefCell<Vec<String>>) {
    self.begin_scope();
    if bind_this {
      self.scopes.last_mut().unwrap().declared.insert("this".to_string());
      self.scopes.last_mut().unwrap().declared.insert("This".to_string());
    }
    for param in params {
      self.declare(param);
    }
    match body {
      FuncBody::Block(stmts) => self.resolve_statements(stmts),
      FuncBody::Expr(expr) => self.resolve_expr(expr),
    }
    let free: Vec<String> = self
      .scopes
      .last()
      .unwrap()
      .free_vars
      .iter()
      .filter(|(_, v)| v.depth.get() >= 1)
      .map(|(name, _)| name.clone())
      .collect();
    *slot.borrow_mut() = free;
    self.end_scope();
  }

  fn resolve_statements(&mut self, statements: &'ast [Stmt<'src>]) {
    for stmt in statements {
      self.resolve_stmt(stmt);
    }
  }

  fn resolve_stmt(&mut self, stmt: &'ast Stmt<'src>) {
    match &**stmt {
      StmtKind::Do(body) => {
        self.resolve_statements(body);
      }
      StmtKind::If(if_stmt) => {
        self.resolve_expr(&if_stmt.condition);
        self.resolve_statements(&if_stmt.then_branch);
        if let Some(else_branch) = &if_stmt.else_branch {
          self.resolve_statements(else_branch);
        }
      }
      StmtKind::For(for_stmt) => {
        self.resolve_expr(&for_stmt.iterable);
        self.declare(&for_stmt.variable);
        self.resolve_statements(&for_stmt.body);
      }
      StmtKind::While(while_stmt) => {
        self.resolve_expr(&while_stmt.condition);
        self.resolve_statements(&while_stmt.body);
      }
      StmtKind::Break => {}
      StmtKind::Return(value) => {
        if let Some(value) = value {
          self.resolve_expr(value);
        }
      }
      StmtKind::Print(expr) => self.resolve_expr(expr),
      StmtKind::Function(decl) => {
        if let Some(name) = &decl.name {
          self.declare(name);
          self.unresolved.insert((&**name).to_string(), decl);
        }
      }
      StmtKind::Struct(decl) => {
        self.declare(&decl.name);
      }
      StmtKind::Trait(decl) => {
        self.declare(&decl.name);
        for member in &decl.members {
          if !member.is_abstract {
            self.resolve_function_body(&member.params, &member.body, true, &member.free_vars);
          }
        }
      }
      StmtKind::Impl(decl) => {
        for member in &decl.members {
          if !member.is_abstract {
            self.resolve_function_body(&member.params, &member.body, true, &member.free_vars);
          }
        }
      }
      StmtKind::Expression(expr) => self.resolve_expr(expr),
    }
  }

  fn resolve_expr(&mut self, expr: &'ast Expr<'src>) {
    match &**expr {
      ExprKind::Literal(_) => {}
      ExprKind::Variable(var) => self.resolve_local(var),
      ExprKind::Assign(assign) => {
        self.resolve_expr(&assign.value);
        self.declare(&assign.name);
        assign.depth.set(self.scopes.len() as i32 - 1);
      }
      ExprKind::Unary(_, operand) => self.resolve_expr(operand),
      ExprKind::Binary(bin) => {
        self.resolve_expr(&bin.left);
        self.resolve_expr(&bin.right);
      }
      ExprKind::Logical(logical) => {
        self.resolve_expr(&logical.left);
        self.resolve_expr(&logical.right);
      }
      ExprKind::Grouping(inner) => self.resolve_expr(inner),
      ExprKind::Range(range) => {
        self.resolve_expr(&range.start);
        self.resolve_expr(&range.stop);
        if let Some(step) = &range.step {
          self.resolve_expr(step);
        }
      }
      ExprKind::Call(call) => {
        self.resolve_expr(&call.callee);
        if let ExprKind::Variable(var) = &*call.callee {
          self.check_function(&var.name);
        }
        for arg in &call.arguments {
          self.resolve_expr(arg);
        }
      }
      ExprKind::Get(get) => self.resolve_expr(&get.object),
      ExprKind::Set(set) => {
        self.resolve_expr(&set.object);
        self.resolve_expr(&set.value);
      }
      ExprKind::If(if_expr) => {
        self.resolve_expr(&if_expr.condition);
        self.resolve_expr(&if_expr.then_branch);
        self.resolve_expr(&if_expr.else_branch);
      }
      ExprKind::Function(decl) => {
        // An anonymous function expression has no name to call recursively
        // by, so there is no benefit in deferring it: resolve immediately.
        self.resolve_function_body(&decl.params, &decl.body, false, &decl.free_vars);
      }
    }
  }
}

pub fn resolve<'ast, 'src>(program: &'ast Program<'src>, source: &'ast Source, builtin_names: &[&str]) -> Vec<Error> {
  Resolver::new(source, builtin_names).resolve_program(program)
}

/// Resolves one REPL line, treating `module_names` (the interpreter's
/// current global environment) as already declared at module scope.
pub fn resolve_repl_line<'ast, 'src>(
  program: &'ast Program<'src>,
  source: &'ast Source,
  builtin_names: &[&str],
  module_names: &[&str],
) -> Vec<Error> {
  Resolver::new(source, builtin_names).resolve_repl_line(program, module_names)
}

#[cfg(test)]
mod tests {
  use zoof_syntax::parser::parse as parse_source;

  use super::*;

  const BUILTINS: &[&str] = &["clock", "arbitraryNumber"];

  fn resolve_src(src: &str) -> Vec<Error> {
    let (program, parse_errors) = parse_source(src);
    assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");
    let source = Source::new("<test>", src);
    resolve(&program, &source, BUILTINS)
  }

  #[test]
  fn simple_local_resolves_without_error() {
    let errors = resolve_src("x = 1\nprint x\n");
    assert!(errors.is_empty(), "{errors:?}");
  }

  #[test]
  fn undefined_variable_is_reported() {
    let errors = resolve_src("print y\n");
    assert!(errors.iter().any(|e| e.code == "E2002"));
  }

  #[test]
  fn mutual_recursion_in_same_scope_resolves() {
    let src = indoc::indoc! {"
            func isEven(n) do
                if n == 0 its true else isOdd(n - 1)

            func isOdd(n) do
                if n == 0 its false else isEven(n - 1)

            print isEven(10)
        "};
    let errors = resolve_src(src);
    assert!(errors.is_empty(), "{errors:?}");
  }

  #[test]
  fn use_before_declare_in_same_scope_is_an_error() {
    // `x` reads the module-scope `x` as a free variable on its first line,
    // then the same scope declares its own local `x` — the ambiguity
    // `declare` rejects, since every read of `x` within `outer`'s body
    // should have referred to one binding, not two.
    let src = indoc::indoc! {"
            x = 1
            func outer() do
                print x
                x = 2
        "};
    let errors = resolve_src(src);
    assert!(errors.iter().any(|e| e.code == "E2001"), "{errors:?}");
  }
}
