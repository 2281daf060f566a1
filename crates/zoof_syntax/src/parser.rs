//! Recursive-descent parser with precedence climbing, structured like the
//! reference `Parser` (a token cursor, `match`/`check`/`advance`/`consume`
//! helpers, a `ParseError` used only to unwind out of a broken statement,
//! caught by the statement loop which calls `synchronize`). The grammar
//! itself (dual `do`/`its` forms, `:`-ranges, `struct`/`trait`/`impl`) has no
//! counterpart in the retrieved Python revisions, so it is implemented
//! directly from the language description rather than ported line-by-line.

use zoof_diag::Loc;

use crate::ast::*;
use crate::error::Error;
use crate::token::{Token, TokenKind};

pub struct Parser<'src> {
  tokens: Vec<Token<'src>>,
  pos: usize,
  errors: Vec<Error>,
}

/// Unwinds parsing of the current statement; caught by the statement loop.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

impl<'src> Parser<'src> {
  pub fn new(tokens: Vec<Token<'src>>) -> Self {
    let tokens: Vec<Token<'src>> = tokens.into_iter().filter(|t| t.kind != TokenKind::Comment).collect();
    Self {
      tokens,
      pos: 0,
      errors: Vec::new(),
    }
  }

  pub fn parse(mut self) -> (Program<'src>, Vec<Error>) {
    let mut statements = Vec::new();
    self.skip_newlines();
    while !self.at_eof() {
      match self.statement() {
        Ok(stmt) => statements.push(stmt),
        Err(ParseError) => self.synchronize(),
      }
      self.skip_newlines();
    }
    (Program { statements }, self.errors)
  }

  // --- token cursor --------------------------------------------------

  fn peek(&self) -> &Token<'src> {
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn peek_kind(&self) -> TokenKind {
    self.peek().kind
  }

  fn at_eof(&self) -> bool {
    self.peek_kind() == TokenKind::Eof
  }

  fn advance(&mut self) -> Token<'src> {
    let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
    if self.pos < self.tokens.len() - 1 {
      self.pos += 1;
    }
    tok
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.peek_kind() == kind
  }

  fn matches(&mut self, kind: TokenKind) -> bool {
    if self.check(kind) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn skip_newlines(&mut self) {
    while self.check(TokenKind::Newline) {
      self.advance();
    }
  }

  fn loc_of(tok: &Token<'_>) -> (Loc, Loc) {
    let start = Loc::new(tok.line, tok.column);
    let end_col = tok.column + tok.lexeme.chars().count() as u32;
    (start, Loc::new(tok.line, end_col))
  }

  fn error_at(&mut self, tok: &Token<'_>, code: &'static str, message: impl Into<String>, explanation: impl Into<String>) -> ParseError {
    let (start, end) = Self::loc_of(tok);
    self.errors.push(Error::new(code, message, start, end, explanation));
    ParseError
  }

  fn expect(&mut self, kind: TokenKind, code: &'static str, what: &str) -> PResult<Token<'src>> {
    if self.check(kind) {
      Ok(self.advance())
    } else {
      let tok = self.peek().clone();
      Err(self.error_at(
        &tok,
        code,
        format!("Expected {what}, found {:?}.", tok.kind),
        "Check that the previous statement or expression is complete.",
      ))
    }
  }

  /// Skips tokens until a likely statement boundary (`Newline` or `Dedent`),
  /// then consumes it, so one bad statement doesn't prevent later ones from
  /// being parsed and diagnosed.
  fn synchronize(&mut self) {
    while !self.at_eof() {
      match self.peek_kind() {
        TokenKind::Newline | TokenKind::Dedent => {
          self.advance();
          return;
        }
        _ => {
          self.advance();
        }
      }
    }
  }

  fn end_of_statement(&mut self) -> PResult<()> {
    if self.check(TokenKind::Newline) {
      self.advance();
      Ok(())
    } else if self.at_eof() || self.check(TokenKind::Dedent) {
      Ok(())
    } else {
      let tok = self.peek().clone();
      Err(self.error_at(
        &tok,
        "E1010",
        "Expected end of statement.",
        "Each statement must end with a newline.",
      ))
    }
  }

  fn indented_block(&mut self) -> PResult<Vec<Stmt<'src>>> {
    self.end_of_statement()?;
    self.expect(TokenKind::Indent, "E1002", "an indented block")?;
    let mut statements = Vec::new();
    loop {
      self.skip_newlines();
      if self.check(TokenKind::Dedent) || self.at_eof() {
        break;
      }
      match self.statement() {
        Ok(stmt) => statements.push(stmt),
        Err(ParseError) => self.synchronize(),
      }
    }
    self.expect(TokenKind::Dedent, "E1003", "a dedent to close the block")?;
    Ok(statements)
  }

  fn ident(&mut self) -> PResult<Ident<'src>> {
    if self.check(TokenKind::Identifier) {
      let tok = self.advance();
      Ok(Ident::new(tok.span, tok.lexeme))
    } else {
      let tok = self.peek().clone();
      Err(self.error_at(&tok, "E1009", "Expected an identifier.", "Names must start with a letter or underscore."))
    }
  }

  // --- statements ------------------------------------------------------

  fn statement(&mut self) -> PResult<Stmt<'src>> {
    match self.peek_kind() {
      TokenKind::Do => self.do_statement(),
      TokenKind::If => self.if_statement(),
      TokenKind::For => self.for_statement(),
      TokenKind::While => self.while_statement(),
      TokenKind::Break => self.break_statement(),
      TokenKind::Return => self.return_statement(),
      TokenKind::Print => self.print_statement(),
      TokenKind::Func | TokenKind::Method | TokenKind::Getter | TokenKind::Setter => self.function_statement(),
      TokenKind::Struct => self.struct_statement(),
      TokenKind::Trait => self.trait_statement(),
      TokenKind::Impl => self.impl_statement(),
      TokenKind::InvalidIndentation => {
        let tok = self.advance();
        Err(self.error_at(
          &tok,
          "E1006",
          "Inconsistent indentation.",
          "This line's indentation doesn't match any enclosing block.",
        ))
      }
      _ => self.expression_statement(),
    }
  }

  fn do_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `do`
    let body = self.indented_block()?;
    let end_span = body.last().map(|s| s.span).unwrap_or(start.span);
    Ok(Stmt::new(start.span.join(end_span), StmtKind::Do(body)))
  }

  fn if_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `if`
    let condition = self.expression(false)?;
    if self.matches(TokenKind::Its) {
      let then_branch = self.expression(false)?;
      self.expect(TokenKind::Else, "E1011", "`else` (if-expressions require an else branch)")?;
      let else_branch = self.expression(false)?;
      let span = start.span.join(else_branch.span);
      let if_expr = Expr::new(
        span,
        ExprKind::If(Box::new(IfExpr {
          condition,
          then_branch,
          else_branch,
        })),
      );
      self.end_of_statement()?;
      return Ok(Stmt::new(span, StmtKind::Expression(Box::new(if_expr))));
    }

    self.expect(TokenKind::Do, "E1012", "`do` or `its` after an `if` condition")?;
    let then_branch = self.indented_block()?;

    let else_branch = if self.check(TokenKind::Elseif) {
      // `elseif` chains desugar to a single nested `If` in the else branch.
      let nested = self.if_statement_from_elseif()?;
      Some(vec![nested])
    } else if self.matches(TokenKind::Else) {
      if self.check(TokenKind::If) {
        let nested = self.if_statement()?;
        Some(vec![nested])
      } else {
        Some(self.indented_block()?)
      }
    } else {
      None
    };

    let end_span = else_branch
      .as_ref()
      .and_then(|b| b.last())
      .or_else(|| then_branch.last())
      .map(|s| s.span)
      .unwrap_or(start.span);
    Ok(Stmt::new(
      start.span.join(end_span),
      StmtKind::If(Box::new(IfStmt {
        condition,
        then_branch,
        else_branch,
      })),
    ))
  }

  fn if_statement_from_elseif(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `elseif`
    let condition = self.expression(false)?;
    self.expect(TokenKind::Do, "E1012", "`do` after an `elseif` condition")?;
    let then_branch = self.indented_block()?;
    let else_branch = if self.check(TokenKind::Elseif) {
      Some(vec![self.if_statement_from_elseif()?])
    } else if self.matches(TokenKind::Else) {
      Some(self.indented_block()?)
    } else {
      None
    };
    let end_span = else_branch
      .as_ref()
      .and_then(|b| b.last())
      .or_else(|| then_branch.last())
      .map(|s| s.span)
      .unwrap_or(start.span);
    Ok(Stmt::new(
      start.span.join(end_span),
      StmtKind::If(Box::new(IfStmt {
        condition,
        then_branch,
        else_branch,
      })),
    ))
  }

  fn for_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `for`
    let variable = self.ident()?;
    self.expect(TokenKind::In, "E1013", "`in` after the loop variable")?;
    let iterable = self.expression(false)?;

    let body = if self.matches(TokenKind::Its) {
      // The `its` body becomes the whole of an expression statement, which
      // is itself a permitted position for a keyword-expression.
      let expr = self.expression(true)?;
      let span = expr.span;
      vec![Stmt::new(span, StmtKind::Expression(Box::new(expr)))]
    } else {
      self.expect(TokenKind::Do, "E1012", "`do` or `its` after a `for` iterable")?;
      self.indented_block()?
    };

    let end_span = body.last().map(|s| s.span).unwrap_or(start.span);
    Ok(Stmt::new(
      start.span.join(end_span),
      StmtKind::For(Box::new(ForStmt {
        variable,
        iterable,
        body,
      })),
    ))
  }

  fn while_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `while`
    let condition = self.expression(false)?;
    self.expect(TokenKind::Do, "E1012", "`do` after a `while` condition")?;
    let body = self.indented_block()?;
    let end_span = body.last().map(|s| s.span).unwrap_or(start.span);
    Ok(Stmt::new(start.span.join(end_span), StmtKind::While(Box::new(WhileStmt { condition, body }))))
  }

  fn break_statement(&mut self) -> PResult<Stmt<'src>> {
    let tok = self.advance();
    self.end_of_statement()?;
    Ok(Stmt::new(tok.span, StmtKind::Break))
  }

  fn return_statement(&mut self) -> PResult<Stmt<'src>> {
    let tok = self.advance();
    let value = if self.check(TokenKind::Newline) || self.at_eof() || self.check(TokenKind::Dedent) {
      None
    } else {
      // Explicitly permitted per spec.md §4.2: a return value.
      Some(Box::new(self.expression(true)?))
    };
    let span = value.as_ref().map(|v| tok.span.join(v.span)).unwrap_or(tok.span);
    self.end_of_statement()?;
    Ok(Stmt::new(span, StmtKind::Return(value)))
  }

  fn print_statement(&mut self) -> PResult<Stmt<'src>> {
    let tok = self.advance();
    // Explicitly permitted per spec.md §4.2: a print value.
    let value = self.expression(true)?;
    let span = tok.span.join(value.span);
    self.end_of_statement()?;
    Ok(Stmt::new(span, StmtKind::Print(Box::new(value))))
  }

  fn function_decl(&mut self, kind: FuncKind, require_name: bool) -> PResult<FunctionDecl<'src>> {
    let name = if require_name || self.check(TokenKind::Identifier) {
      Some(self.ident()?)
    } else {
      None
    };
    self.expect(TokenKind::LParen, "E1014", "`(` to begin the parameter list")?;
    let mut params = Vec::new();
    if !self.check(TokenKind::RParen) {
      loop {
        params.push(self.ident()?);
        if !self.matches(TokenKind::Comma) {
          break;
        }
      }
    }
    self.expect(TokenKind::RParen, "E1015", "`)` to close the parameter list")?;

    if self.matches(TokenKind::Its) {
      // An expression-form function body stands in for a return value.
      let expr = self.expression(true)?;
      self.end_of_statement()?;
      return Ok(FunctionDecl {
        kind,
        name,
        params,
        body: FuncBody::Expr(Box::new(expr)),
        is_abstract: false,
        free_vars: std::cell::RefCell::new(Vec::new()),
      });
    }
    if self.matches(TokenKind::Do) {
      let body = self.indented_block()?;
      return Ok(FunctionDecl {
        kind,
        name,
        params,
        body: FuncBody::Block(body),
        is_abstract: false,
        free_vars: std::cell::RefCell::new(Vec::new()),
      });
    }
    // Neither `do` nor `its` follows: an abstract trait member declaration.
    self.end_of_statement()?;
    Ok(FunctionDecl {
      kind,
      name,
      params,
      body: FuncBody::Block(Vec::new()),
      is_abstract: true,
      free_vars: std::cell::RefCell::new(Vec::new()),
    })
  }

  fn function_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.peek().span;
    let kind = match self.advance().kind {
      TokenKind::Func => FuncKind::Func,
      TokenKind::Method => FuncKind::Method,
      TokenKind::Getter => FuncKind::Getter,
      TokenKind::Setter => FuncKind::Setter,
      _ => unreachable!(),
    };
    let decl = self.function_decl(kind, true)?;
    Ok(Stmt::new(start, StmtKind::Function(Box::new(decl))))
  }

  fn struct_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `struct`
    let name = self.ident()?;
    self.end_of_statement()?;
    self.expect(TokenKind::Indent, "E1002", "an indented block of fields")?;
    let mut fields = Vec::new();
    loop {
      self.skip_newlines();
      if self.check(TokenKind::Dedent) || self.at_eof() {
        break;
      }
      let field_name = self.ident()?;
      let ty = self.ident()?;
      self.end_of_statement()?;
      fields.push(FieldDecl { name: field_name, ty });
    }
    self.expect(TokenKind::Dedent, "E1003", "a dedent to close the struct body")?;
    Ok(Stmt::new(start.span, StmtKind::Struct(Box::new(StructDecl { name, fields }))))
  }

  fn trait_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `trait`
    let name = self.ident()?;
    self.end_of_statement()?;
    self.expect(TokenKind::Indent, "E1002", "an indented block of trait members")?;
    let mut members = Vec::new();
    loop {
      self.skip_newlines();
      if self.check(TokenKind::Dedent) || self.at_eof() {
        break;
      }
      let kind = match self.peek_kind() {
        TokenKind::Func => FuncKind::Func,
        TokenKind::Method => FuncKind::Method,
        TokenKind::Getter => FuncKind::Getter,
        TokenKind::Setter => FuncKind::Setter,
        _ => {
          let tok = self.peek().clone();
          return Err(self.error_at(&tok, "E1016", "Expected a function, method, getter or setter declaration.", "Trait bodies may only declare members."));
        }
      };
      self.advance();
      members.push(self.function_decl(kind, true)?);
    }
    self.expect(TokenKind::Dedent, "E1003", "a dedent to close the trait body")?;
    Ok(Stmt::new(start.span, StmtKind::Trait(Box::new(TraitDecl { name, members }))))
  }

  fn impl_statement(&mut self) -> PResult<Stmt<'src>> {
    let start = self.advance(); // `impl`
    let first = self.ident()?;
    let (trait_name, struct_name) = if self.matches(TokenKind::For) {
      (Some(first), self.ident()?)
    } else {
      (None, first)
    };
    self.end_of_statement()?;
    self.expect(TokenKind::Indent, "E1002", "an indented block of impl members")?;
    let mut members = Vec::new();
    loop {
      self.skip_newlines();
      if self.check(TokenKind::Dedent) || self.at_eof() {
        break;
      }
      let kind = match self.peek_kind() {
        TokenKind::Func => FuncKind::Func,
        TokenKind::Method => FuncKind::Method,
        TokenKind::Getter => FuncKind::Getter,
        TokenKind::Setter => FuncKind::Setter,
        _ => {
          let tok = self.peek().clone();
          return Err(self.error_at(&tok, "E1016", "Expected a function, method, getter or setter declaration.", "Impl bodies may only declare members."));
        }
      };
      self.advance();
      members.push(self.function_decl(kind, true)?);
    }
    self.expect(TokenKind::Dedent, "E1003", "a dedent to close the impl body")?;
    Ok(Stmt::new(
      start.span,
      StmtKind::Impl(Box::new(ImplDecl {
        trait_name,
        struct_name,
        members,
      })),
    ))
  }

  fn expression_statement(&mut self) -> PResult<Stmt<'src>> {
    // Explicitly permitted per spec.md §4.2: the top of an expression statement.
    let expr = self.expression(true)?;
    let span = expr.span;
    self.end_of_statement()?;
    Ok(Stmt::new(span, StmtKind::Expression(Box::new(expr))))
  }

  // --- expressions: precedence climbing ---------------------------------
  //
  // Keyword-expressions (`if ... its ... else ...`, `func(...) its ...`) are
  // only allowed where spec.md §4.2 explicitly permits them: a print value, a
  // return value, the right-hand side of an assignment, inside parentheses,
  // as a function-call argument, or as the whole of an expression statement.
  // Everywhere else a bare `allow_kw = false` threads down through the
  // precedence chain and `keyword_or_primary` reports an error instead of
  // silently accepting one as a sub-expression of an arithmetic/comparison
  // chain.

  pub fn expression(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    self.assignment(allow_kw)
  }

  fn assignment(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let target = self.logical_or(allow_kw)?;
    if self.matches(TokenKind::Equal) {
      // The right-hand side of `=` is always a permitted position for a
      // keyword-expression, regardless of the surrounding context.
      let value = self.assignment(true)?; // right-associative
      let span = target.span.join(value.span);
      return match target.into_inner() {
        ExprKind::Variable(v) => Ok(Expr::new(
          span,
          ExprKind::Assign(Box::new(AssignExpr {
            name: v.name,
            depth: v.depth,
            value,
          })),
        )),
        ExprKind::Get(get) => Ok(Expr::new(
          span,
          ExprKind::Set(Box::new(SetExpr {
            object: get.object,
            access: get.access,
            name: get.name,
            value,
          })),
        )),
        _ => {
          let tok = self.peek().clone();
          Err(self.error_at(&tok, "E1004", "Invalid assignment target.", "Only a variable or a `.`/`..` field access can appear on the left of `=`."))
        }
      };
    }
    Ok(target)
  }

  fn logical_or(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.logical_and(allow_kw)?;
    while self.matches(TokenKind::Or) {
      let right = self.logical_and(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Logical(Box::new(LogicalExpr { left, op: LogicalOp::Or, right })));
    }
    Ok(left)
  }

  fn logical_and(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.equality(allow_kw)?;
    while self.matches(TokenKind::And) {
      let right = self.equality(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Logical(Box::new(LogicalExpr { left, op: LogicalOp::And, right })));
    }
    Ok(left)
  }

  fn equality(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.comparison(allow_kw)?;
    loop {
      let op = match self.peek_kind() {
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::Ne,
        _ => break,
      };
      self.advance();
      let right = self.comparison(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Binary(Box::new(BinaryExpr { left, op, right })));
    }
    Ok(left)
  }

  fn comparison(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.range(allow_kw)?;
    loop {
      let op = match self.peek_kind() {
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEqual => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEqual => BinaryOp::Ge,
        _ => break,
      };
      self.advance();
      let right = self.range(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Binary(Box::new(BinaryExpr { left, op, right })));
    }
    Ok(left)
  }

  fn range(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let start = self.term(allow_kw)?;
    if self.matches(TokenKind::Colon) {
      let stop = self.term(allow_kw)?;
      let step = if self.matches(TokenKind::Colon) { Some(self.term(allow_kw)?) } else { None };
      let span = start.span.join(step.as_ref().map(|s| s.span).unwrap_or(stop.span));
      return Ok(Expr::new(span, ExprKind::Range(Box::new(RangeExpr { start, stop, step }))));
    }
    Ok(start)
  }

  fn term(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.factor(allow_kw)?;
    loop {
      let op = match self.peek_kind() {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        _ => break,
      };
      self.advance();
      let right = self.factor(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Binary(Box::new(BinaryExpr { left, op, right })));
    }
    Ok(left)
  }

  fn factor(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let mut left = self.power(allow_kw)?;
    loop {
      let op = match self.peek_kind() {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        _ => break,
      };
      self.advance();
      let right = self.power(allow_kw)?;
      let span = left.span.join(right.span);
      left = Expr::new(span, ExprKind::Binary(Box::new(BinaryExpr { left, op, right })));
    }
    Ok(left)
  }

  fn power(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    let left = self.unit(allow_kw)?;
    if self.matches(TokenKind::Caret) {
      let right = self.power(allow_kw)?; // right-associative
      let span = left.span.join(right.span);
      return Ok(Expr::new(span, ExprKind::Binary(Box::new(BinaryExpr { left, op: BinaryOp::Pow, right }))));
    }
    Ok(left)
  }

  /// A "unit": an optional, non-stacking unary sign, then a keyword
  /// expression or a primary (with its postfix `()`/`.`/`..` chain).
  fn unit(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    if self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
      let op_tok = self.advance();
      let op = if op_tok.kind == TokenKind::Minus { UnaryOp::Neg } else { UnaryOp::Pos };
      let operand = self.keyword_or_primary(allow_kw)?;
      let span = op_tok.span.join(operand.span);
      return Ok(Expr::new(span, ExprKind::Unary(op, Box::new(operand))));
    }
    self.keyword_or_primary(allow_kw)
  }

  fn keyword_or_primary(&mut self, allow_kw: bool) -> PResult<Expr<'src>> {
    match self.peek_kind() {
      TokenKind::If if allow_kw => self.if_expression(),
      TokenKind::Func | TokenKind::Method | TokenKind::Getter | TokenKind::Setter if allow_kw => self.function_expression(),
      TokenKind::If | TokenKind::Func | TokenKind::Method | TokenKind::Getter | TokenKind::Setter => {
        let tok = self.peek().clone();
        Err(self.error_at(
          &tok,
          "E1020",
          "An `if`/`func` expression can't appear here.",
          "Wrap it in parentheses to use its value inside a larger expression.",
        ))
      }
      _ => self.call(),
    }
  }

  fn if_expression(&mut self) -> PResult<Expr<'src>> {
    let start = self.advance(); // `if`
    let condition = self.expression(false)?;
    self.expect(TokenKind::Its, "E1017", "`its` (if-expressions use `its`, not `do`)")?;
    let then_branch = self.expression(false)?;
    self.expect(TokenKind::Else, "E1011", "`else` (if-expressions require an else branch)")?;
    let else_branch = self.expression(false)?;
    let span = start.span.join(else_branch.span);
    Ok(Expr::new(
      span,
      ExprKind::If(Box::new(IfExpr {
        condition,
        then_branch,
        else_branch,
      })),
    ))
  }

  fn function_expression(&mut self) -> PResult<Expr<'src>> {
    let start = self.peek().span;
    let kind = match self.advance().kind {
      TokenKind::Func => FuncKind::Func,
      TokenKind::Method => FuncKind::Method,
      TokenKind::Getter => FuncKind::Getter,
      TokenKind::Setter => FuncKind::Setter,
      _ => unreachable!(),
    };
    let decl = self.function_decl(kind, false)?;
    Ok(Expr::new(start, ExprKind::Function(Box::new(decl))))
  }

  fn call(&mut self) -> PResult<Expr<'src>> {
    let mut expr = self.primary()?;
    loop {
      if self.matches(TokenKind::LParen) {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RParen) {
          loop {
            if arguments.len() >= 250 {
              let tok = self.peek().clone();
              return Err(self.error_at(&tok, "E1018", "Too many arguments.", "A call may take at most 250 arguments."));
            }
            // Explicitly permitted per spec.md §4.2: function arguments.
            arguments.push(self.expression(true)?);
            if !self.matches(TokenKind::Comma) {
              break;
            }
          }
        }
        let end = self.expect(TokenKind::RParen, "E1015", "`)` to close the argument list")?;
        let span = expr.span.join(end.span);
        expr = Expr::new(span, ExprKind::Call(Box::new(CallExpr { callee: expr, arguments })));
      } else if self.check(TokenKind::Dot) || self.check(TokenKind::DotDot) {
        let access = if self.advance().kind == TokenKind::Dot { Access::Dot } else { Access::DotDot };
        let name = self.ident()?;
        let span = expr.span.join(name.span);
        expr = Expr::new(span, ExprKind::Get(Box::new(GetExpr { object: expr, access, name })));
      } else {
        break;
      }
    }
    Ok(expr)
  }

  fn primary(&mut self) -> PResult<Expr<'src>> {
    let tok = self.peek().clone();
    match tok.kind {
      TokenKind::Number => {
        self.advance();
        let value: f64 = tok.lexeme.parse().unwrap_or(0.0);
        Ok(Expr::new(tok.span, ExprKind::Literal(Literal::Number(value))))
      }
      TokenKind::String => {
        self.advance();
        Ok(Expr::new(tok.span, ExprKind::Literal(Literal::String(tok.lexeme))))
      }
      TokenKind::True => {
        self.advance();
        Ok(Expr::new(tok.span, ExprKind::Literal(Literal::Bool(true))))
      }
      TokenKind::False => {
        self.advance();
        Ok(Expr::new(tok.span, ExprKind::Literal(Literal::Bool(false))))
      }
      TokenKind::Nil => {
        self.advance();
        Ok(Expr::new(tok.span, ExprKind::Literal(Literal::Nil)))
      }
      TokenKind::Identifier => {
        self.advance();
        Ok(Expr::new(tok.span, ExprKind::Variable(VariableRef::new(Ident::new(tok.span, tok.lexeme)))))
      }
      TokenKind::LParen => {
        self.advance();
        // Explicitly permitted per spec.md §4.2: parenthesized groups.
        let inner = self.expression(true)?;
        let end = self.expect(TokenKind::RParen, "E1015", "`)` to close the parenthesized expression")?;
        Ok(Expr::new(tok.span.join(end.span), ExprKind::Grouping(Box::new(inner))))
      }
      TokenKind::UnterminatedString => {
        self.advance();
        Err(self.error_at(&tok, "E1007", "Unterminated string.", "Strings must be closed with `'` before the end of the line."))
      }
      TokenKind::InvalidIndentation => Err(self.error_at(&tok, "E1006", "Inconsistent indentation.", "This line's indentation doesn't match any enclosing block.")),
      TokenKind::Reserved => Err(self.error_at(
        &tok,
        "E1019",
        format!("`{}` is a reserved word and cannot be used here.", tok.lexeme),
        "Reserved words are set aside for a future version of the language.",
      )),
      _ => Err(self.error_at(
        &tok,
        "E1001",
        format!("Unexpected token {:?}.", tok.kind),
        "Expected a literal, identifier or parenthesized expression.",
      )),
    }
  }
}

pub fn parse(src: &str) -> (Program<'_>, Vec<Error>) {
  let tokens = crate::lexer::Lexer::lex(src);
  Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_ok(src: &str) -> Program<'_> {
    let (program, errors) = parse(src);
    assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
    program
  }

  #[test]
  fn arithmetic_precedence() {
    let program = parse_ok("print 3 + 4 * 2\n");
    assert_eq!(program.statements.len(), 1);
  }

  #[test]
  fn if_statement_with_else() {
    let program = parse_ok("if 1 == 1 do\n    print 'yes'\nelse\n    print 'no'\n");
    assert_eq!(program.statements.len(), 1);
    match &*program.statements[0] {
      StmtKind::If(if_stmt) => assert!(if_stmt.else_branch.is_some()),
      other => panic!("expected If, got {other:?}"),
    }
  }

  #[test]
  fn if_expression_form() {
    let program = parse_ok("print if 2 < 3 its 'a' else 'b'\n");
    match &*program.statements[0] {
      StmtKind::Print(expr) => assert!(matches!(&***expr, ExprKind::If(_))),
      other => panic!("expected Print, got {other:?}"),
    }
  }

  #[test]
  fn for_loop_over_range() {
    let program = parse_ok("for i in 0:3 do\n    print i\n");
    assert!(matches!(&*program.statements[0], StmtKind::For(_)));
  }

  #[test]
  fn struct_and_impl() {
    let program = parse_ok("struct Vector\n    x num\n    y num\n\nimpl Vector\n    getter length() its x\n");
    assert_eq!(program.statements.len(), 2);
  }

  #[test]
  fn invalid_assignment_target_reports_error() {
    let (_, errors) = parse("1 = 2\n");
    assert!(errors.iter().any(|e| e.code == "E1004"));
  }
}
