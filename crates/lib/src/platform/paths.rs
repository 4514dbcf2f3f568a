//! Well-known directories.
//!
//! Every location can be redirected through an environment variable so tests
//! and build agents can isolate their stores.

use std::path::PathBuf;

use crate::consts::APP_NAME;

/// Overrides the store root (build trees, packages, locks).
pub const STORE_ENV: &str = "KILN_STORE";
/// Overrides the dependency registry root.
pub const REGISTRY_ENV: &str = "KILN_REGISTRY";
/// Overrides the path of the configuration file.
pub const CONFIG_ENV: &str = "KILN_CONFIG";

pub(crate) fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, falling back to the working directory.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the user's home directory, falling back to the working directory.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  env_path("APPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  env_path("XDG_CONFIG_HOME")
    .unwrap_or_else(|| home_dir().join(".config"))
    .join(APP_NAME)
}

#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  env_path("LOCALAPPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  env_path("XDG_DATA_HOME")
    .unwrap_or_else(|| home_dir().join(".local").join("share"))
    .join(APP_NAME)
}

/// Store root: `$KILN_STORE`, else `<data_dir>/store`.
pub fn store_dir() -> PathBuf {
  env_path(STORE_ENV).unwrap_or_else(|| data_dir().join("store"))
}

/// Registry root: `$KILN_REGISTRY`, else `<data_dir>/registry`.
pub fn registry_dir() -> PathBuf {
  env_path(REGISTRY_ENV).unwrap_or_else(|| data_dir().join("registry"))
}

/// Config file: `$KILN_CONFIG`, else `<config_dir>/config.json`.
pub fn config_file() -> PathBuf {
  env_path(CONFIG_ENV).unwrap_or_else(|| config_dir().join("config.json"))
}
