//! Implementation of the `kiln validate` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use kiln_lib::eval::Hook;

use crate::cmd::{PlatformArgs, Session, runtime};
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct ValidateArgs {
  /// Recipe file or project directory
  #[arg(default_value = ".")]
  pub recipe: PathBuf,

  #[command(flatten)]
  pub platform: PlatformArgs,
}

/// Runs `init` and `validate` for every requested platform.
pub fn cmd_validate(args: ValidateArgs, config: Option<&Path>) -> Result<()> {
  let session = Session::open(&args.recipe, config)?;
  let rt = runtime()?;

  for request in args.platform.requests(&session.config) {
    let platform = request.platform.clone();
    rt.block_on(session.evaluator.run_hooks(&[Hook::Init, Hook::Validate], request))
      .with_context(|| format!("Validation failed for {}", platform))?;
    print_success(&format!("{} accepts {}", session.evaluator.recipe().name, platform));
  }
  Ok(())
}
