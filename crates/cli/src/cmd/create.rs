//! Implementation of the `kiln create` command.
//!
//! Runs every lifecycle hook for each requested platform, building at most
//! once per package identity and reusing completed builds from the store.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use kiln_lib::error::{ErrorClass, RecipeError};
use kiln_lib::eval::EvaluationReport;
use kiln_lib::platform::Platform;

use crate::cmd::{PlatformArgs, Session, runtime};
use crate::output::{OutputFormat, print_error, print_json, print_stat, print_success, truncate_hash};

#[derive(Args, Debug)]
pub struct CreateArgs {
  /// Recipe file or project directory
  #[arg(default_value = ".")]
  pub recipe: PathBuf,

  #[command(flatten)]
  pub platform: PlatformArgs,

  /// Copy deployable artifacts into this directory
  #[arg(long)]
  pub deploy: Option<PathBuf>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct FailedEvaluation {
  platform: Platform,
  class: ErrorClass,
  retryable: bool,
  message: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
  Ok(EvaluationReport),
  Failed(FailedEvaluation),
}

pub fn cmd_create(args: CreateArgs, config: Option<&std::path::Path>) -> Result<()> {
  let session = Session::open(&args.recipe, config)?;
  let mut requests = args.platform.requests(&session.config);
  if let Some(dir) = &args.deploy {
    if requests.len() > 1 {
      bail!(
        "--deploy copies into one directory; pick a single platform instead of {}",
        requests.len()
      );
    }
    requests = requests.into_iter().map(|r| r.with_deploy_dir(dir)).collect();
  }
  let platforms: Vec<Platform> = requests.iter().map(|r| r.platform.clone()).collect();

  let started = Instant::now();
  let results = runtime()?.block_on(session.evaluator.evaluate_all(requests));
  let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);

  let outcomes: Vec<Outcome> = platforms
    .into_iter()
    .zip(results)
    .map(|(platform, result)| match result {
      Ok(report) => Outcome::Ok(report),
      Err(err) => Outcome::Failed(failed(platform, &err)),
    })
    .collect();
  let failures = outcomes.iter().filter(|o| matches!(o, Outcome::Failed(_))).count();

  if args.output.is_json() {
    print_json(&outcomes)?;
  } else {
    for outcome in &outcomes {
      print_outcome(outcome);
    }
    println!();
    println!("Finished in {}", humantime::format_duration(elapsed));
  }

  if failures > 0 {
    bail!("{} of {} evaluation(s) failed", failures, outcomes.len());
  }
  Ok(())
}

fn failed(platform: Platform, err: &RecipeError) -> FailedEvaluation {
  let class = err.class();
  FailedEvaluation {
    platform,
    class,
    retryable: class.is_retryable(),
    message: err.to_string(),
  }
}

fn print_outcome(outcome: &Outcome) {
  match outcome {
    Outcome::Ok(report) => {
      let how = if report.cached { "reused" } else { "built" };
      print_success(&format!(
        "{}/{} for {} ({})",
        report.recipe, report.version, report.platform, how
      ));
      print_stat("Package ID", truncate_hash(report.package_id.as_str()));
      print_stat("Build ID", truncate_hash(report.build_id.as_str()));
      print_stat("Package", &report.package_dir.display().to_string());
      print_stat("Files", &report.packaged.len().to_string());
      if !report.deployed.is_empty() {
        print_stat("Deployed", &report.deployed.len().to_string());
      }
    }
    Outcome::Failed(failure) => {
      print_error(&format!("{}: [{}] {}", failure.platform, failure.class, failure.message));
    }
  }
}
