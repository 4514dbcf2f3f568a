//! Native build invocation and the build store.
//!
//! The native build itself is external. This module decides where it runs,
//! hands it the evaluation's inputs, and records a completion marker so that
//! later evaluations with the same build identity can reuse the output.
//!
//! # Submodules
//!
//! - [`cmake`] - CMake subprocess adapter
//! - [`lock`] - per-identity build locks
//! - [`marker`] - completion markers and output verification
//! - [`realize`] - cache lookup, locking and invocation
//! - [`store`] - on-disk store layout

pub mod cmake;
pub mod lock;
pub mod marker;
pub mod realize;
pub mod store;

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::platform::Platform;
use crate::recipe::BuildOptions;
use crate::registry::ResolvedDependency;

/// A failed external build, carrying the tool's own diagnostics untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("build failed during {stage}: {detail}")]
pub struct BuildFailure {
  pub stage: String,
  pub detail: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<i32>,
}

impl BuildFailure {
  pub fn new(stage: &str, detail: &str) -> Self {
    Self {
      stage: stage.to_string(),
      detail: detail.to_string(),
      code: None,
    }
  }

  pub fn with_code(mut self, code: Option<i32>) -> Self {
    self.code = code;
    self
  }
}

/// Everything the native build receives.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub recipe: String,
  pub source_dir: PathBuf,
  pub output_dir: PathBuf,
  pub platform: Platform,
  pub options: BuildOptions,
  pub dependencies: Vec<ResolvedDependency>,
}

/// The directory a successful build left its outputs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputTree {
  pub root: PathBuf,
}

impl OutputTree {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

/// Runs the external build system.
///
/// Implementations marshal the request into the tool's invocation and report
/// its verdict; they never retry.
pub trait BuildInvoker: Send + Sync {
  fn invoke(&self, request: &BuildRequest) -> impl Future<Output = Result<OutputTree, BuildFailure>> + Send;
}
