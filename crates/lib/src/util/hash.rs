//! Hashing primitives for identities and build-output verification.
//!
//! - `Fingerprint`: truncated digest of a canonically serialized value. Used for
//!   package/build identities and therefore for store directory names.
//! - `ContentHash`: full SHA-256 digest of file or directory contents.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A truncated, lowercase hex SHA-256 digest of a serialized value.
///
/// Serialization goes through `serde_json`, so structs hashed this way must only
/// contain ordered collections (`BTreeMap`, `Vec`) to stay deterministic across
/// processes and machines.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Anything serializable can be fingerprinted.
pub trait Fingerprintable: Serialize {
  fn fingerprint(&self) -> Result<Fingerprint, HashError> {
    let serialized = serde_json::to_vec(self)?;
    let full = hex::encode(Sha256::digest(&serialized));
    Ok(Fingerprint(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

/// A full 64-character SHA-256 digest of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum DirHashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },

  #[error("failed to read symlink {path}: {message}")]
  ReadSymlink { path: String, message: String },
}

/// Compute a deterministic hash of a directory tree.
///
/// Covers relative paths, file contents and symlink targets; ignores timestamps
/// and permissions. Entries whose file name is listed in `exclude` are skipped
/// together with everything below them.
pub fn hash_directory(path: &Path, exclude: &[&str]) -> Result<ContentHash, DirHashError> {
  let mut entries: Vec<(String, String)> = Vec::new();

  let walker = WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|e| {
    e.file_name()
      .to_str()
      .map(|name| !exclude.contains(&name))
      .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(|e| DirHashError::WalkDir { message: e.to_string() })?;
    let entry_path = entry.path();

    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .to_string_lossy()
      .replace('\\', "/");

    if rel_path.is_empty() {
      continue;
    }

    let file_type = entry.file_type();
    let line = if file_type.is_file() {
      format!("F:{}:{}", rel_path, hash_file(entry_path)?)
    } else if file_type.is_dir() {
      format!("D:{}", rel_path)
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry_path).map_err(|e| DirHashError::ReadSymlink {
        path: entry_path.display().to_string(),
        message: e.to_string(),
      })?;
      format!("L:{}:{}", rel_path, hash_bytes(target.to_string_lossy().as_bytes()))
    } else {
      continue;
    };

    entries.push((rel_path, line));
  }

  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, line) in entries {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash a single file's contents.
pub fn hash_file(path: &Path) -> Result<ContentHash, DirHashError> {
  let read_err = |e: std::io::Error| DirHashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let n = file.read(&mut buffer).map_err(read_err)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}
