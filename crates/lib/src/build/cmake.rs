//! CMake adapter.
//!
//! Runs `cmake -S <source> -B <output> -D...` followed by
//! `cmake --build <output>`. Each step is a named stage so a failure reports
//! where it happened.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::build::{BuildFailure, BuildInvoker, BuildRequest, OutputTree};

pub const CONFIGURE_STAGE: &str = "configure";
pub const BUILD_STAGE: &str = "build";

/// CMake settings that are not part of the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CMakeConfig {
  /// The cmake executable.
  pub program: String,
  /// Toolchain file, e.g. emsdk's `Emscripten.cmake`.
  pub toolchain_file: Option<PathBuf>,
  pub generator: Option<String>,
  /// Parallel jobs for the build stage.
  pub jobs: Option<usize>,
  /// Extra `-D` cache entries.
  pub definitions: BTreeMap<String, String>,
}

impl Default for CMakeConfig {
  fn default() -> Self {
    Self {
      program: "cmake".to_string(),
      toolchain_file: None,
      generator: None,
      jobs: None,
      definitions: BTreeMap::new(),
    }
  }
}

impl CMakeConfig {
  /// Settings that can change the produced binaries' ABI: the toolchain file
  /// and every user `-D` entry.
  pub fn abi_inputs(&self) -> BTreeMap<String, String> {
    let mut inputs: BTreeMap<String, String> = self
      .definitions
      .iter()
      .map(|(key, value)| (format!("cmake.D.{}", key), value.clone()))
      .collect();
    if let Some(toolchain) = &self.toolchain_file {
      inputs.insert("cmake.toolchain_file".to_string(), toolchain.to_string_lossy().to_string());
    }
    inputs
  }

  /// Settings that only change how the build runs.
  pub fn build_inputs(&self) -> BTreeMap<String, String> {
    let mut inputs = BTreeMap::from([("cmake.program".to_string(), self.program.clone())]);
    if let Some(generator) = &self.generator {
      inputs.insert("cmake.generator".to_string(), generator.clone());
    }
    if let Some(jobs) = self.jobs {
      inputs.insert("cmake.jobs".to_string(), jobs.to_string());
    }
    inputs
  }
}

#[derive(Debug, Clone, Default)]
pub struct CMakeInvoker {
  config: CMakeConfig,
}

impl CMakeInvoker {
  pub fn new(config: CMakeConfig) -> Self {
    Self { config }
  }

  /// All `-D` entries for the configure stage.
  pub fn definitions(&self, request: &BuildRequest) -> BTreeMap<String, String> {
    let mut defs = self.config.definitions.clone();

    if let Some(build_type) = request.platform.build_type {
      defs.insert("CMAKE_BUILD_TYPE".to_string(), build_type.to_string());
    }
    if let Some(toolchain) = &self.config.toolchain_file {
      defs.insert("CMAKE_TOOLCHAIN_FILE".to_string(), toolchain.to_string_lossy().to_string());
    }
    defs.extend(request.options.cmake_definitions());

    if !request.dependencies.is_empty() {
      let prefix_path = request
        .dependencies
        .iter()
        .map(|d| d.path.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(";");
      defs.insert("CMAKE_PREFIX_PATH".to_string(), prefix_path);

      for dep in &request.dependencies {
        defs.insert(format!("{}_ROOT", dep.name), dep.path.to_string_lossy().to_string());
      }
    }

    defs
  }

  pub fn configure_args(&self, request: &BuildRequest) -> Vec<String> {
    let mut args = vec![
      "-S".to_string(),
      request.source_dir.to_string_lossy().to_string(),
      "-B".to_string(),
      request.output_dir.to_string_lossy().to_string(),
    ];
    if let Some(generator) = &self.config.generator {
      args.push("-G".to_string());
      args.push(generator.clone());
    }
    for (key, value) in self.definitions(request) {
      args.push(format!("-D{}={}", key, value));
    }
    args
  }

  pub fn build_args(&self, request: &BuildRequest) -> Vec<String> {
    let mut args = vec!["--build".to_string(), request.output_dir.to_string_lossy().to_string()];
    if let Some(build_type) = request.platform.build_type {
      args.push("--config".to_string());
      args.push(build_type.to_string());
    }
    if let Some(jobs) = self.config.jobs {
      args.push("--parallel".to_string());
      args.push(jobs.to_string());
    }
    args
  }

  async fn run_stage(&self, stage: &str, args: &[String]) -> Result<(), BuildFailure> {
    info!(stage, program = %self.config.program, "running cmake");
    debug!(?args, "cmake arguments");

    let output = Command::new(&self.config.program)
      .args(args)
      .output()
      .await
      .map_err(|e| BuildFailure::new(stage, &format!("failed to run {}: {}", self.config.program, e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      let detail = if stderr.trim().is_empty() { stdout } else { stderr };
      return Err(BuildFailure::new(stage, detail.trim_end()).with_code(output.status.code()));
    }

    Ok(())
  }
}

impl BuildInvoker for CMakeInvoker {
  async fn invoke(&self, request: &BuildRequest) -> Result<OutputTree, BuildFailure> {
    self.run_stage(CONFIGURE_STAGE, &self.configure_args(request)).await?;
    self.run_stage(BUILD_STAGE, &self.build_args(request)).await?;
    Ok(OutputTree::new(&request.output_dir))
  }
}
