//! On-disk store layout.
//!
//! ```text
//! <store>/
//!   build/<build_id>/       native build output plus completion marker
//!   package/<package_id>/   packaged artifacts
//!   locks/<package_id>.lock per-identity build locks
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::identity::Identity;
use crate::util::hash::DirHashError;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid build marker at {}: {message}", path.display())]
  Marker { path: PathBuf, message: String },

  #[error(transparent)]
  Hash(#[from] DirHashError),
}

impl StoreError {
  pub(crate) fn io(path: &Path, source: io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
  root: PathBuf,
}

impl Store {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn build_dir(&self, build_id: &Identity) -> PathBuf {
    self.root.join("build").join(build_id.as_str())
  }

  pub fn package_dir(&self, package_id: &Identity) -> PathBuf {
    self.root.join("package").join(package_id.as_str())
  }

  pub fn locks_dir(&self) -> PathBuf {
    self.root.join("locks")
  }

  pub fn lock_path(&self, package_id: &Identity) -> PathBuf {
    self.locks_dir().join(format!("{}.lock", package_id))
  }
}
