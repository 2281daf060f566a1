/// Owns the text of a compilation unit: its name (file path or `"<repl>"`),
/// its `lineOffset` (so a REPL line can be embedded at an arbitrary starting
/// line of a logical session), and its lines split for display.
///
/// Immutable after construction, matching the reference `Source` object
/// which is only ever replaced wholesale via `swapSource`, never mutated.
#[derive(Clone, Debug)]
pub struct Source {
  name: String,
  line_offset: u32,
  text: String,
  lines: Vec<String>,
}

impl Source {
  pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
    Self::with_line_offset(name, text, 0)
  }

  pub fn with_line_offset(name: impl Into<String>, text: impl Into<String>, line_offset: u32) -> Self {
    let text = text.into();
    let mut lines: Vec<String> = text.split('\n').map(|s| s.trim_end_matches('\r').to_owned()).collect();
    if lines.last().map(|l| !l.is_empty()).unwrap_or(true) {
      lines.push(String::new());
    }
    Self {
      name: name.into(),
      line_offset,
      text,
      lines,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn line_offset(&self) -> u32 {
    self.line_offset
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  /// Zero-indexed line count, including the synthetic trailing blank line.
  pub fn line_count(&self) -> usize {
    self.lines.len()
  }

  /// `line` is 1-based and absolute (already includes `line_offset`).
  pub fn line(&self, line: u32) -> &str {
    let idx = (line as i64 - self.line_offset as i64 - 1).max(0) as usize;
    self.lines.get(idx).map(|s| s.as_str()).unwrap_or("")
  }

  /// Converts a byte offset into the source text to a 1-based `(line, column)`
  /// pair, with `line_offset` applied — mirroring how `zoofc1`'s lexer stamps
  /// `Token.line`/`Token.column` directly as it scans.
  pub fn locate(&self, byte_offset: usize) -> (u32, u32) {
    let offset = byte_offset.min(self.text.len());
    let mut line: u32 = 1;
    let mut last_newline = 0usize;
    for (i, b) in self.text.as_bytes()[..offset].iter().enumerate() {
      if *b == b'\n' {
        line += 1;
        last_newline = i + 1;
      }
    }
    let column = (offset - last_newline) as u32 + 1;
    (line + self.line_offset, column)
  }
}
