//! A hand-written, indentation-aware lexer.
//!
//! The algorithm is ported from the original implementation's line-by-line
//! scanner (`Lexer.processLine`/`finish` in the Python reference) rather than
//! adapted from a `logos`-derived token stream: Zoof's grammar needs explicit
//! `Indent`/`Dedent`/`InvalidIndentation` tokens so the parser never has to
//! look at a column number itself, and no off-the-shelf regex lexer emits
//! those directly.

use beef::lean::Cow;
use zoof_span::Span;

use crate::token::{Token, TokenKind};

pub struct Lexer<'src> {
  src: &'src str,
  bytes: &'src [u8],
  /// Byte offset of the start of the current line.
  line_start: usize,
  /// Byte offset of the next unconsumed character.
  pos: usize,
  line: u32,
  /// Whitespace-width stack for indentation tracking. Starts at `[0]`.
  indent_stack: Vec<u32>,
  tokens: Vec<Token<'src>>,
}

impl<'src> Lexer<'src> {
  pub fn lex(src: &'src str) -> Vec<Token<'src>> {
    let mut lexer = Lexer {
      src,
      bytes: src.as_bytes(),
      line_start: 0,
      pos: 0,
      line: 1,
      indent_stack: vec![0],
      tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
  }

  fn run(&mut self) {
    while self.pos < self.bytes.len() {
      self.process_line();
    }
    self.finish();
  }

  fn peek_byte(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn column_at(&self, pos: usize) -> u32 {
    (pos - self.line_start) as u32 + 1
  }

  /// Consumes one line: handles indentation based on the first significant
  /// token, then emits the rest of the line's tokens terminated by `Newline`.
  fn process_line(&mut self) {
    self.line_start = self.pos;

    // Skip horizontal whitespace to find the column of the first token.
    let mut scan = self.pos;
    while matches!(self.bytes.get(scan), Some(b' ') | Some(b'\t')) {
      scan += 1;
    }
    let first_column = self.column_at(scan);

    let first_is_blank_or_comment = matches!(self.bytes.get(scan), None | Some(b'\n')) || self.bytes.get(scan) == Some(b'#');

    if !first_is_blank_or_comment {
      let width = first_column - 1;
      let top = *self.indent_stack.last().unwrap();
      if width > top {
        self.indent_stack.push(width);
        self.push(TokenKind::Indent, "", scan..scan, first_column);
      } else if width < top {
        let mut dedents = 0u32;
        while width < *self.indent_stack.last().unwrap() {
          self.indent_stack.pop();
          dedents += 1;
        }
        if width == *self.indent_stack.last().unwrap() {
          for _ in 0..dedents {
            self.push(TokenKind::Dedent, "", scan..scan, first_column);
          }
        } else {
          // No stack level matches: report the failure and leave the stack
          // as already popped, matching the reference scanner exactly.
          self.push(TokenKind::InvalidIndentation, "", scan..scan, first_column);
        }
      }
    }

    self.pos = scan;
    loop {
      if self.pos >= self.bytes.len() {
        break;
      }
      let kind = self.scan_token();
      if matches!(kind, TokenKind::Newline) {
        break;
      }
    }
  }

  fn push(&mut self, kind: TokenKind, lexeme: impl Into<Cow<'src, str>>, span: std::ops::Range<usize>, column: u32) {
    let span = Span::from(span);
    self.tokens.push(Token::new(kind, lexeme, span, self.line, column));
  }

  /// Scans exactly one token starting at `self.pos`, pushes it, and returns
  /// its kind (so the caller can detect end-of-line).
  fn scan_token(&mut self) -> TokenKind {
    // Horizontal whitespace between tokens is insignificant once past the
    // line's leading indentation.
    while matches!(self.peek_byte(), Some(b' ') | Some(b'\t')) {
      self.pos += 1;
    }

    let start = self.pos;
    let column = self.column_at(start);

    let Some(c) = self.peek_byte() else {
      self.push(TokenKind::Eof, "", start..start, column);
      return TokenKind::Eof;
    };

    let kind = match c {
      b'\n' => {
        self.pos += 1;
        self.line += 1;
        TokenKind::Newline
      }
      b'#' => {
        while !matches!(self.peek_byte(), None | Some(b'\n')) {
          self.pos += 1;
        }
        TokenKind::Comment
      }
      b'(' => self.single(TokenKind::LParen),
      b')' => self.single(TokenKind::RParen),
      b'{' => self.single(TokenKind::LBrace),
      b'}' => self.single(TokenKind::RBrace),
      b',' => self.single(TokenKind::Comma),
      b';' => self.single(TokenKind::Semicolon),
      b'+' => self.single(TokenKind::Plus),
      b'-' => self.single(TokenKind::Minus),
      b'*' => self.single(TokenKind::Star),
      b'/' => self.single(TokenKind::Slash),
      b'^' => self.single(TokenKind::Caret),
      b':' => self.single(TokenKind::Colon),
      b'.' => {
        self.pos += 1;
        if self.peek_byte() == Some(b'.') {
          self.pos += 1;
          if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            TokenKind::Ellipsis
          } else {
            TokenKind::DotDot
          }
        } else {
          TokenKind::Dot
        }
      }
      b'=' => {
        self.pos += 1;
        if self.peek_byte() == Some(b'=') {
          self.pos += 1;
          TokenKind::EqualEqual
        } else {
          TokenKind::Equal
        }
      }
      b'!' => {
        self.pos += 1;
        if self.peek_byte() == Some(b'=') {
          self.pos += 1;
          TokenKind::BangEqual
        } else {
          TokenKind::Invalid
        }
      }
      b'<' => {
        self.pos += 1;
        if self.peek_byte() == Some(b'=') {
          self.pos += 1;
          TokenKind::LessEqual
        } else {
          TokenKind::Less
        }
      }
      b'>' => {
        self.pos += 1;
        if self.peek_byte() == Some(b'=') {
          self.pos += 1;
          TokenKind::GreaterEqual
        } else {
          TokenKind::Greater
        }
      }
      b'\'' => return self.scan_string(start, column),
      b'0'..=b'9' => return self.scan_number(start, column),
      c if c == b'_' || c.is_ascii_alphabetic() => return self.scan_identifier(start, column),
      _ => {
        self.pos += 1;
        TokenKind::Invalid
      }
    };

    let lexeme = &self.src[start..self.pos];
    self.push(kind, lexeme, start..self.pos, column);
    kind
  }

  fn single(&mut self, kind: TokenKind) -> TokenKind {
    self.pos += 1;
    kind
  }

  fn scan_string(&mut self, start: usize, column: u32) -> TokenKind {
    self.pos += 1; // opening quote
    loop {
      match self.peek_byte() {
        Some(b'\'') => {
          self.pos += 1;
          let lexeme = &self.src[start + 1..self.pos - 1];
          self.push(TokenKind::String, lexeme, start..self.pos, column);
          return TokenKind::String;
        }
        None | Some(b'\n') => {
          let lexeme = &self.src[start..self.pos];
          self.push(TokenKind::UnterminatedString, lexeme, start..self.pos, column);
          return TokenKind::UnterminatedString;
        }
        Some(_) => self.pos += 1,
      }
    }
  }

  fn scan_number(&mut self, start: usize, column: u32) -> TokenKind {
    while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
      self.pos += 1;
    }
    if self.peek_byte() == Some(b'.') && matches!(self.bytes.get(self.pos + 1), Some(b'0'..=b'9')) {
      self.pos += 1;
      while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
        self.pos += 1;
      }
    }
    let lexeme = &self.src[start..self.pos];
    self.push(TokenKind::Number, lexeme, start..self.pos, column);
    TokenKind::Number
  }

  fn scan_identifier(&mut self, start: usize, column: u32) -> TokenKind {
    while matches!(self.peek_byte(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
      self.pos += 1;
    }
    let lexeme = &self.src[start..self.pos];
    let kind = if let Some(kw) = TokenKind::keyword_from_str(lexeme) {
      kw
    } else if TokenKind::is_reserved_word(lexeme) {
      TokenKind::Reserved
    } else {
      TokenKind::Identifier
    };
    self.push(kind, lexeme, start..self.pos, column);
    kind
  }

  /// Drains the indent stack and emits a final `EOF`.
  fn finish(&mut self) {
    let column = self.column_at(self.pos);
    while self.indent_stack.len() > 1 {
      self.indent_stack.pop();
      self.push(TokenKind::Dedent, "", self.pos..self.pos, column);
    }
    self.push(TokenKind::Eof, "", self.pos..self.pos, column);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::lex(src).into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn totality_ends_in_eof() {
    let k = kinds("print 1\n");
    assert_eq!(*k.last().unwrap(), TokenKind::Eof);
  }

  #[test]
  fn indent_dedent_is_balanced() {
    use TokenKind::*;
    let src = "if 1 == 1 do\n    print 'yes'\nelse\n    print 'no'\n";
    let k = kinds(src);
    let indents = k.iter().filter(|t| **t == Indent).count();
    let dedents = k.iter().filter(|t| **t == Dedent).count();
    assert_eq!(indents, dedents);
  }

  #[test]
  fn range_colon_and_keywords() {
    use TokenKind::*;
    let k = kinds("for i in 0:3 do\n    print i\n");
    assert!(k.contains(&For));
    assert!(k.contains(&In));
    assert!(k.contains(&Colon));
    assert!(k.contains(&Do));
  }

  #[test]
  fn unterminated_string_reported_as_token_not_panic() {
    let k = kinds("print 'oops\n");
    assert!(k.contains(&TokenKind::UnterminatedString));
  }

  #[test]
  fn no_trailing_newline_emits_a_single_eof() {
    let k = kinds("print 1");
    assert_eq!(k.iter().filter(|t| **t == TokenKind::Eof).count(), 1);

    let k = kinds("   ");
    assert_eq!(k.iter().filter(|t| **t == TokenKind::Eof).count(), 1);

    let k = kinds("if 1 == 1 do\n    print 1\n    ");
    assert_eq!(k.iter().filter(|t| **t == TokenKind::Eof).count(), 1);
  }

  #[test]
  fn invalid_dedent_level() {
    // Dedent to a column with no matching stack entry.
    let src = "do\n    do\n        print 1\n      print 2\n";
    let k = kinds(src);
    assert!(k.contains(&TokenKind::InvalidIndentation));
  }
}
