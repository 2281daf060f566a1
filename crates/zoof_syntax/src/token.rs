use std::fmt;

use beef::lean::Cow;
use zoof_span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum TokenKind {
  // Delimiters
  LParen,
  RParen,
  LBrace,
  RBrace,

  // Punctuation
  Comma,
  Dot,
  DotDot,
  Ellipsis,
  Colon,
  Semicolon,

  // Operators
  Plus,
  Minus,
  Star,
  Slash,
  Caret,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
  EqualEqual,
  BangEqual,
  Equal,

  // Literals
  Identifier,
  String,
  Number,
  True,
  False,
  Nil,

  // Keywords
  Print,
  Import,
  From,
  As,
  And,
  Or,
  Func,
  Method,
  Getter,
  Setter,
  Return,
  If,
  Elseif,
  Else,
  Then,
  Its,
  For,
  In,
  While,
  Do,
  Break,
  Struct,
  Trait,
  Impl,

  /// A word reserved for future use (`super`, `this`, `switch`, `match`):
  /// not otherwise meaningful to the lexer, but flagged so the parser can
  /// reject it as an identifier with a clear diagnostic instead of a
  /// confusing downstream error.
  Reserved,

  Comment,
  Newline,
  Indent,
  Dedent,

  /// Scanned but meaningless input (e.g. a lone `!`); never accepted into
  /// an AST node without a diagnostic first being raised.
  Invalid,
  /// A dedent that didn't land on any level already on the indent stack.
  InvalidIndentation,
  /// A `'...'` string with no closing quote before end of line.
  UnterminatedString,

  Eof,
}

impl TokenKind {
  pub fn keyword_from_str(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
      "print" => Print,
      "import" => Import,
      "from" => From,
      "as" => As,
      "and" => And,
      "or" => Or,
      "func" => Func,
      "method" => Method,
      "getter" => Getter,
      "setter" => Setter,
      "return" => Return,
      "if" => If,
      "elseif" => Elseif,
      "else" => Else,
      "then" => Then,
      "its" => Its,
      "for" => For,
      "in" => In,
      "while" => While,
      "do" => Do,
      "break" => Break,
      "struct" => Struct,
      "trait" => Trait,
      "impl" => Impl,
      "true" => True,
      "false" => False,
      "nil" => Nil,
      _ => return None,
    })
  }

  pub fn is_reserved_word(word: &str) -> bool {
    matches!(word, "super" | "switch" | "match")
  }
}

#[derive(Clone, Debug)]
pub struct Token<'src> {
  pub kind: TokenKind,
  pub lexeme: Cow<'src, str>,
  pub span: Span,
  /// 1-based source line.
  pub line: u32,
  /// 1-based column of the first character of the lexeme.
  pub column: u32,
}

impl<'src> Token<'src> {
  pub fn new(kind: TokenKind, lexeme: impl Into<Cow<'src, str>>, span: Span, line: u32, column: u32) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      span,
      line,
      column,
    }
  }
}

impl<'src> fmt::Display for Token<'src> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?} `{}` @{}:{}", self.kind, self.lexeme, self.line, self.column)
  }
}
