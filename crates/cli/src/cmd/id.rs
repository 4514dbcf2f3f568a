//! Implementation of the `kiln id` command.
//!
//! Prints the package and build identities a `create` would use, without
//! resolving dependencies or building.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use kiln_lib::eval::Identities;
use kiln_lib::platform::Platform;

use crate::cmd::{PlatformArgs, Session, runtime};
use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Args, Debug)]
pub struct IdArgs {
  /// Recipe file or project directory
  #[arg(default_value = ".")]
  pub recipe: PathBuf,

  #[command(flatten)]
  pub platform: PlatformArgs,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct PlatformIdentities {
  platform: Platform,
  #[serde(flatten)]
  identities: Identities,
}

pub fn cmd_id(args: IdArgs, config: Option<&Path>) -> Result<()> {
  let session = Session::open(&args.recipe, config)?;
  let rt = runtime()?;

  let mut rows = Vec::new();
  for request in args.platform.requests(&session.config) {
    let platform = request.platform.clone();
    let identities = rt
      .block_on(session.evaluator.identities(request))
      .with_context(|| format!("Failed to compute identities for {}", platform))?;
    rows.push(PlatformIdentities { platform, identities });
  }

  if args.output.is_json() {
    return print_json(&rows);
  }
  for row in &rows {
    println!("{}", row.platform);
    print_stat("Package ID", row.identities.package_id.as_str());
    print_stat("Build ID", row.identities.build_id.as_str());
  }
  Ok(())
}
