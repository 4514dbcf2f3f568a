//! Top-level evaluation error and its classification.
//!
//! Every stage error converts into [`RecipeError`]. Orchestrators key their
//! retry/skip decisions off [`RecipeError::class`], so each variant maps to
//! exactly one [`ErrorClass`].

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::build::BuildFailure;
use crate::build::lock::LockError;
use crate::build::store::StoreError;
use crate::eval::Hook;
use crate::pins::PinError;
use crate::platform::Os;
use crate::registry::RegistryError;
use crate::util::hash::HashError;
use crate::version::ManifestError;

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
  /// The environment or recipe is wrong; detected before any build side effect.
  Configuration,
  /// The project manifest could not be read or parsed.
  Manifest,
  /// A pin could not be resolved by the dependency registry.
  DependencyResolution,
  /// The external build system failed.
  Build,
  /// An expected output file is absent after a successful build.
  MissingArtifact,
  /// Store, lock or filesystem trouble unrelated to the recipe itself.
  Internal,
}

impl ErrorClass {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Configuration => "configuration",
      Self::Manifest => "manifest",
      Self::DependencyResolution => "dependency_resolution",
      Self::Build => "build",
      Self::MissingArtifact => "missing_artifact",
      Self::Internal => "internal",
    }
  }

  /// Only dependency resolution may succeed on a later attempt without the
  /// recipe or environment changing.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::DependencyResolution)
  }
}

impl std::fmt::Display for ErrorClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum RecipeError {
  #[error("{os} not supported (only available for {allowed})")]
  UnsupportedPlatform { os: Os, allowed: Os },

  #[error("invalid recipe {}: {message}", path.display())]
  InvalidRecipe { path: PathBuf, message: String },

  #[error("invalid option '{name}': {message}")]
  InvalidOption { name: String, message: String },

  #[error("deploy directory {} is shared by concurrent evaluations", dir.display())]
  DeployConflict { dir: PathBuf },

  #[error(transparent)]
  InvalidPin(#[from] PinError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  DependencyResolution(#[from] RegistryError),

  #[error(transparent)]
  Build(#[from] BuildFailure),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error("failed to compute identity: {0}")]
  Identity(#[from] HashError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("hook '{hook}' needs the result of '{requires}', which has not run")]
  HookOutOfOrder { hook: Hook, requires: Hook },
}

impl RecipeError {
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::UnsupportedPlatform { .. }
      | Self::InvalidRecipe { .. }
      | Self::InvalidOption { .. }
      | Self::DeployConflict { .. }
      | Self::InvalidPin(_) => ErrorClass::Configuration,
      Self::Manifest(_) => ErrorClass::Manifest,
      Self::DependencyResolution(_) => ErrorClass::DependencyResolution,
      Self::Build(_) => ErrorClass::Build,
      Self::Artifact(ArtifactError::Missing { .. }) => ErrorClass::MissingArtifact,
      Self::Artifact(_) | Self::Identity(_) | Self::Lock(_) | Self::Store(_) | Self::HookOutOfOrder { .. } => {
        ErrorClass::Internal
      }
    }
  }
}
