use clap::{Args, Subcommand};

use crate::common::InputArgs;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
  /// Execute a Zoof file [default]
  Run(RunArgs),
  /// Start an interactive session.
  Repl,
}

impl Command {
  pub fn run(input: InputArgs) -> Self {
    Self::Run(RunArgs { input, dump: false })
  }

  /// Runs the command and returns the process exit code it produced.
  /// A nonzero return here is an ordinary Zoof-level failure (syntax,
  /// name or runtime error), already reported to stderr — it is not
  /// propagated as an `anyhow::Error`, which is reserved for CLI-level
  /// usage failures (a missing file, a TTY with no input).
  pub fn execute(self) -> anyhow::Result<i32> {
    match self {
      Self::Run(args) => handle_run(args),
      Self::Repl => handle_repl(),
    }
  }
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
  /// If provided, dumps the resolved AST after execution.
  #[clap(long, default_value_t = false)]
  dump: bool,
  #[clap(flatten)]
  input: InputArgs,
}

fn handle_repl() -> anyhow::Result<i32> {
  crate::repl::run().map_err(|e| anyhow::anyhow!(e))?;
  Ok(0)
}

fn handle_run(args: RunArgs) -> anyhow::Result<i32> {
  let source = args.input.source()?;
  let name = args.input.name();

  let mut zoof = zoof::Zoof::new();
  let outcome = zoof.run(&name, &source);

  if args.dump {
    let (program, _) = zoof_syntax::parse(&source);
    eprintln!("{:#?}", program);
  }

  if !outcome.reports.is_empty() {
    crate::report::print_reports(&name, &source, &outcome.reports);
  }

  Ok(outcome.diagnostics.exit_code())
}
