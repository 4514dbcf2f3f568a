//! User configuration.
//!
//! Read from `$KILN_CONFIG` or `<config_dir>/config.json`. A missing file is
//! the same as an empty one. Environment variables take precedence over the
//! file for the store and registry locations.
//!
//! ```json
//! {
//!   "store": "/var/cache/kiln",
//!   "registry": "/opt/deps",
//!   "common_pins": ["emsdk/3.1.8"],
//!   "tooling": { "emscripten": "3.1.8" },
//!   "options": { "fPIC": "false" },
//!   "cmake": { "toolchain_file": "/emsdk/Emscripten.cmake", "jobs": 8 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::build::cmake::CMakeConfig;
use crate::consts::KILN_VERSION;
use crate::pins::DependencyPin;
use crate::platform::paths::{self, REGISTRY_ENV, STORE_ENV, env_path};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub store: Option<PathBuf>,
  pub registry: Option<PathBuf>,
  /// Pins applied to every recipe before its own.
  pub common_pins: Vec<DependencyPin>,
  /// Build-time-only inputs, e.g. tool versions. Only affect the build identity.
  pub tooling: BTreeMap<String, String>,
  /// Option overrides applied to every evaluation, before command-line ones.
  pub options: BTreeMap<String, String>,
  pub cmake: CMakeConfig,
}

impl Config {
  /// Load from the default location.
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&paths::config_file())
  }

  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      debug!(path = ?path, "no config file, using defaults");
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, "loaded config");
    Ok(config)
  }

  /// `$KILN_STORE`, else `store`, else the default data directory.
  pub fn store_dir(&self) -> PathBuf {
    env_path(STORE_ENV)
      .or_else(|| self.store.clone())
      .unwrap_or_else(paths::store_dir)
  }

  /// `$KILN_REGISTRY`, else `registry`, else the default data directory.
  pub fn registry_dir(&self) -> PathBuf {
    env_path(REGISTRY_ENV)
      .or_else(|| self.registry.clone())
      .unwrap_or_else(paths::registry_dir)
  }

  /// Configured tooling, how cmake runs, and the running kiln version.
  pub fn build_inputs(&self) -> BTreeMap<String, String> {
    let mut inputs = self.tooling.clone();
    inputs.extend(self.cmake.build_inputs());
    inputs.insert("kiln".to_string(), KILN_VERSION.to_string());
    inputs
  }

  /// Configuration that can change the ABI of what gets built.
  pub fn abi_inputs(&self) -> BTreeMap<String, String> {
    self.cmake.abi_inputs()
  }
}
