use clap::Parser;
use zoof_cli::commands::Command;
use zoof_cli::common::InputArgs;

#[derive(Debug, Parser)]
#[clap(name = "zoof", version)]
pub struct App {
  #[clap(subcommand)]
  command: Option<Command>,

  // Args for the default run command
  #[clap(flatten)]
  input: InputArgs,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_env("ZOOF_LOG"))
    .with_writer(std::io::stderr)
    .init();

  let app = App::parse();

  let command = app.command.unwrap_or_else(|| Command::run(app.input.clone()));

  // A usage-level failure (bad file, stdin is a TTY) never reaches
  // `Zoof::run`, so it can't carry one of the 0/65/70 exit codes that
  // `Diagnostics::exit_code` already assigns. It gets its own reserved
  // code instead of overlapping those.
  match command.execute() {
    Ok(exit_code) => std::process::exit(exit_code),
    Err(err) => {
      eprintln!("error: {err:#}");
      std::process::exit(64);
    }
  }
}
