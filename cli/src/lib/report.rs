use zoof_diag::{Report, Source, Style};

/// Whether stderr is a color-capable terminal, probed once per process the
/// same way the REPL and the one-shot `run` path both need it.
pub fn stderr_style() -> Style {
  let enabled = supports_color::on(supports_color::Stream::Stderr)
    .map(|c| c.has_basic)
    .unwrap_or(false);
  Style { enabled, ..Style::plain() }
}

pub fn print_reports(name: &str, source_text: &str, reports: &[Report]) {
  let source = Source::new(name.to_string(), source_text.to_string());
  let style = stderr_style();
  for report in reports {
    eprintln!("{}", report.render_with(&source, &style));
    eprintln!();
  }
}
