//! Dependency registry: turns pins into local dependency locations.
//!
//! Fetching and building third-party code happens elsewhere; the registry only
//! answers where an already-available `(name, version)` lives.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::pins::DependencyPin;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("dependency {name}/{version} not found (looked in {})", searched.display())]
  NotFound {
    name: String,
    version: String,
    searched: PathBuf,
  },

  #[error("dependency {name}/{version} is unusable: {message}")]
  Unusable {
    name: String,
    version: String,
    message: String,
  },
}

/// A pin resolved to a directory the native build can consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
  pub name: String,
  pub version: String,
  pub path: PathBuf,
}

pub trait DependencyRegistry: Send + Sync {
  fn resolve(&self, pin: &DependencyPin) -> Result<ResolvedDependency, RegistryError>;
}

/// Registry backed by a directory laid out as `<root>/<name>/<version>/`.
#[derive(Debug, Clone)]
pub struct LocalRegistry {
  root: PathBuf,
}

impl LocalRegistry {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl DependencyRegistry for LocalRegistry {
  fn resolve(&self, pin: &DependencyPin) -> Result<ResolvedDependency, RegistryError> {
    let path = self.root.join(&pin.name).join(&pin.version);

    if !path.exists() {
      return Err(RegistryError::NotFound {
        name: pin.name.clone(),
        version: pin.version.clone(),
        searched: path,
      });
    }
    if !path.is_dir() {
      return Err(RegistryError::Unusable {
        name: pin.name.clone(),
        version: pin.version.clone(),
        message: format!("{} is not a directory", path.display()),
      });
    }

    let path = dunce::canonicalize(&path).unwrap_or(path);
    debug!(dependency = %pin, path = %path.display(), "resolved dependency");
    Ok(ResolvedDependency {
      name: pin.name.clone(),
      version: pin.version.clone(),
      path,
    })
  }
}

/// Resolve every pin, failing on the first one that cannot be resolved.
pub fn resolve_all(
  registry: &dyn DependencyRegistry,
  pins: &[DependencyPin],
) -> Result<Vec<ResolvedDependency>, RegistryError> {
  pins.iter().map(|pin| registry.resolve(pin)).collect()
}
