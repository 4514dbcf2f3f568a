mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{CreateArgs, IdArgs, InfoArgs, ValidateArgs};
use output::print_error;

/// kiln - evaluate build recipes into identified, packaged artifacts
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Configuration file (default: $KILN_CONFIG or <config_dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the full lifecycle: validate, build, package and optionally deploy
  Create(CreateArgs),

  /// Check that a recipe loads and accepts the target platform
  Validate(ValidateArgs),

  /// Print package and build identities without building
  Id(IdArgs),

  /// Show host platform and recipe details
  Info(InfoArgs),
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let config = cli.config.as_deref();
  let result = match cli.command {
    Commands::Create(args) => cmd::cmd_create(args, config),
    Commands::Validate(args) => cmd::cmd_validate(args, config),
    Commands::Id(args) => cmd::cmd_id(args, config),
    Commands::Info(args) => cmd::cmd_info(args, config),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
