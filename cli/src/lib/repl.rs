use rustyline::error::ReadlineError;
use rustyline::Editor;
use zoof::Zoof;
use zoof_syntax::{Lexer, TokenKind};

struct Repl {
  zoof: Zoof,
  editor: Editor<()>,
  line_no: u32,
}

enum ParseResult {
  Incomplete,
  Complete,
}

enum Control {
  Eval,
  Loop,
}

impl Repl {
  fn new() -> rustyline::Result<Self> {
    Ok(Self {
      zoof: Zoof::new(),
      editor: Editor::new()?,
      line_no: 1,
    })
  }

  fn read_multi_line_input(&mut self, buffer: &mut String) -> Result<Control, ReadlineError> {
    let mut prev_line = String::new();
    loop {
      if !buffer.is_empty() {
        buffer.push('\n');
      }
      let ws = &prev_line[..prev_line.chars().take_while(|c| c.is_ascii_whitespace()).count()];
      let prompt = if buffer.is_empty() { "> " } else { ". " };
      let line = self.editor.readline_with_initial(prompt, (ws, ""))?;
      prev_line.clear();
      prev_line.push_str(&line);
      self.editor.add_history_entry(&line);
      buffer.push_str(&line);

      if try_cmd(buffer) {
        return Ok(Control::Loop);
      }

      match validate(buffer) {
        ParseResult::Incomplete => continue,
        ParseResult::Complete => break Ok(Control::Eval),
      }
    }
  }
}

fn try_cmd(input: &str) -> bool {
  matches!(input.trim(), ".exit" | ".quit")
}

/// Decides whether `input` still has an open block the user hasn't finished
/// typing yet, so the REPL should keep reading lines instead of handing the
/// buffer to the resolver/interpreter (which would otherwise just bounce it
/// back with a dedent/indentation error).
///
/// Tokenizes with the real lexer rather than guessing from raw text: a line
/// that ends on `do` always opens a block body (`if`/`for`/`while`), and
/// `struct`/`impl`/`trait` headers open one without any such trailing
/// keyword, so both are read off the token stream's last non-trivial kind
/// before the lexer's own end-of-input dedent drain instead of textual
/// colon-matching.
fn validate(input: &str) -> ParseResult {
  fn is_empty(line: &str) -> bool {
    line.trim().is_empty()
  }

  fn is_indented(line: &str) -> bool {
    line.starts_with(|c: char| c == ' ' || c == '\t')
  }

  let last_line = input.split('\n').last().unwrap_or("");
  if !is_empty(last_line) && is_indented(last_line) {
    return ParseResult::Incomplete;
  }

  let tokens = Lexer::lex(input);
  let opens_block = tokens
    .iter()
    .rev()
    .map(|t| t.kind)
    .find(|k| !matches!(k, TokenKind::Dedent | TokenKind::Eof | TokenKind::Newline | TokenKind::Comment))
    .map(|k| matches!(k, TokenKind::Do | TokenKind::Struct | TokenKind::Trait | TokenKind::Impl))
    .unwrap_or(false);

  if opens_block {
    ParseResult::Incomplete
  } else {
    ParseResult::Complete
  }
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> rustyline::Result<()> {
  let mut repl = Repl::new()?;
  let mut buffer = String::new();

  println!("Zoof REPL v{VERSION}\nPress CTRL-D to exit");

  loop {
    buffer.clear();

    match repl.read_multi_line_input(&mut buffer) {
      Ok(Control::Eval) => {}
      Ok(Control::Loop) => continue,
      Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(()),
      Err(ReadlineError::WindowResized) => continue,
      Err(e) => return Err(e),
    };

    let name = format!("<repl:{}>", repl.line_no);
    let outcome = repl.zoof.eval_line(&name, &buffer);
    repl.line_no += 1;

    if !outcome.reports.is_empty() {
      crate::report::print_reports(&name, &buffer, &outcome.reports);
      continue;
    }

    if let Some(value) = outcome.value {
      println!("{}", value.stringify());
    }
  }
}
