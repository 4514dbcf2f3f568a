//! Build completion markers.
//!
//! A marker is written into the build directory only after the native build
//! succeeded. It records which build identity produced the directory and a
//! hash of its contents, so a later evaluation can tell a complete, untouched
//! build apart from an interrupted or modified one.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::build::store::StoreError;
use crate::consts::BUILD_COMPLETE_MARKER;
use crate::identity::Identity;
use crate::util::hash::hash_directory;

/// Entries excluded from the output hash.
pub const BUILD_HASH_EXCLUSIONS: &[&str] = &[BUILD_COMPLETE_MARKER];

const MARKER_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMarker {
  pub version: u32,
  pub status: String,
  pub build_id: Identity,
  pub package_id: Identity,
  pub output_hash: String,
}

/// Hash the build directory and write its marker.
pub fn write_marker(build_dir: &Path, build_id: &Identity, package_id: &Identity) -> Result<BuildMarker, StoreError> {
  let output_hash = hash_directory(build_dir, BUILD_HASH_EXCLUSIONS)?;
  let marker = BuildMarker {
    version: MARKER_VERSION,
    status: "complete".to_string(),
    build_id: build_id.clone(),
    package_id: package_id.clone(),
    output_hash: output_hash.0,
  };

  let path = build_dir.join(BUILD_COMPLETE_MARKER);
  let content = serde_json::to_string(&marker).map_err(|e| StoreError::Marker {
    path: path.clone(),
    message: e.to_string(),
  })?;
  std::fs::write(&path, format!("{}\n", content)).map_err(|e| StoreError::io(&path, e))?;
  Ok(marker)
}

/// Read a build directory's marker, `None` if there is none.
pub fn read_marker(build_dir: &Path) -> Result<Option<BuildMarker>, StoreError> {
  let path = build_dir.join(BUILD_COMPLETE_MARKER);
  if !path.exists() {
    return Ok(None);
  }
  let content = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
  let marker = serde_json::from_str(&content).map_err(|e| StoreError::Marker {
    path,
    message: e.to_string(),
  })?;
  Ok(Some(marker))
}

/// Whether `build_dir` holds a complete, unmodified build for `build_id`.
pub fn is_reusable(build_dir: &Path, build_id: &Identity) -> bool {
  let marker = match read_marker(build_dir) {
    Ok(Some(marker)) => marker,
    Ok(None) => {
      debug!(path = ?build_dir, "no completion marker");
      return false;
    }
    Err(e) => {
      debug!(path = ?build_dir, error = %e, "invalid marker");
      return false;
    }
  };

  if marker.build_id != *build_id {
    warn!(path = ?build_dir, expected = %build_id, found = %marker.build_id, "marker belongs to another build");
    return false;
  }

  match hash_directory(build_dir, BUILD_HASH_EXCLUSIONS) {
    Ok(current) if current.0 == marker.output_hash => true,
    Ok(current) => {
      warn!(
        path = ?build_dir,
        expected = %marker.output_hash,
        actual = %current,
        "build output modified, will rebuild"
      );
      false
    }
    Err(e) => {
      warn!(path = ?build_dir, error = %e, "failed to hash build output, will rebuild");
      false
    }
  }
}
