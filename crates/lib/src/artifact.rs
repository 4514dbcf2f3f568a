//! Selecting and copying build outputs.
//!
//! Copy rules are applied to the output tree to produce an [`ArtifactSet`]:
//! for each rule, files below `<tree>/<src>` whose path relative to `src`
//! matches `pattern` are placed at `<dst>/<relative path>`. The set is then
//! copied either into the store's package directory or a deploy directory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::build::OutputTree;
use crate::consts::BUILD_COMPLETE_MARKER;
use crate::recipe::{CopyRule, RecipeDef};

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("expected artifact '{pattern}' not found under '{src}' in the build output")]
  Missing { pattern: String, src: String },

  #[error("invalid artifact pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },

  #[error("failed to scan build output: {message}")]
  Walk { message: String },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to prepare {}: {source}", path.display())]
  Stage {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Files to copy: destination (relative) -> source (absolute).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactSet {
  entries: BTreeMap<PathBuf, PathBuf>,
}

impl ArtifactSet {
  pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
    self.entries.iter().map(|(dest, src)| (dest.as_path(), src.as_path()))
  }

  pub fn destinations(&self) -> impl Iterator<Item = &Path> {
    self.entries.keys().map(PathBuf::as_path)
  }

  pub fn contains(&self, dest: impl AsRef<Path>) -> bool {
    self.entries.contains_key(dest.as_ref())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Copy every entry below `target`, returning the written paths.
  pub fn copy_into(&self, target: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    let mut written = Vec::with_capacity(self.entries.len());
    for (dest, src) in &self.entries {
      let to = target.join(dest);
      if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Stage {
          path: parent.to_path_buf(),
          source,
        })?;
      }
      std::fs::copy(src, &to).map_err(|source| ArtifactError::Copy {
        from: src.clone(),
        to: to.clone(),
        source,
      })?;
      written.push(to);
    }
    Ok(written)
  }
}

/// Applies a recipe's package and deploy rules to an output tree.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSelector {
  package: Vec<CopyRule>,
  deploy: Vec<CopyRule>,
}

impl ArtifactSelector {
  pub fn new(package: Vec<CopyRule>, deploy: Vec<CopyRule>) -> Self {
    Self { package, deploy }
  }

  pub fn from_recipe(recipe: &RecipeDef) -> Self {
    Self::new(recipe.package.clone(), recipe.deploy.clone())
  }

  pub fn select_package(&self, tree: &OutputTree) -> Result<ArtifactSet, ArtifactError> {
    select(&self.package, tree)
  }

  pub fn select_deploy(&self, tree: &OutputTree) -> Result<ArtifactSet, ArtifactError> {
    select(&self.deploy, tree)
  }
}

fn select(rules: &[CopyRule], tree: &OutputTree) -> Result<ArtifactSet, ArtifactError> {
  let mut set = ArtifactSet::default();
  for rule in rules {
    let matched = apply_rule(rule, &tree.root, &mut set)?;
    debug!(pattern = %rule.pattern, src = %rule.src, matched, "applied copy rule");
    if matched == 0 && rule.must_match() {
      return Err(ArtifactError::Missing {
        pattern: rule.pattern.clone(),
        src: rule.src.clone(),
      });
    }
  }
  Ok(set)
}

fn apply_rule(rule: &CopyRule, root: &Path, set: &mut ArtifactSet) -> Result<usize, ArtifactError> {
  let pattern = Pattern::new(&rule.pattern).map_err(|e| ArtifactError::Pattern {
    pattern: rule.pattern.clone(),
    message: e.to_string(),
  })?;
  let options = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
  };

  let base = root.join(&rule.src);
  if !base.is_dir() {
    return Ok(0);
  }

  let mut matched = 0;
  for entry in WalkDir::new(&base).sort_by_file_name() {
    let entry = entry.map_err(|e| ArtifactError::Walk { message: e.to_string() })?;
    if !entry.file_type().is_file() || entry.file_name() == BUILD_COMPLETE_MARKER {
      continue;
    }
    let Ok(rel) = entry.path().strip_prefix(&base) else {
      continue;
    };
    let rel_str = rel.to_string_lossy().replace('\\', "/");
    if pattern.matches_with(&rel_str, options) {
      set
        .entries
        .insert(Path::new(&rule.dst).join(rel), entry.path().to_path_buf());
      matched += 1;
    }
  }
  Ok(matched)
}

/// Copy `set` into `package_dir`, replacing any previous payload.
///
/// Files are staged in a sibling temp directory and renamed into place, so the
/// package directory is either absent, the old payload, or the complete new one.
pub fn install_package(set: &ArtifactSet, package_dir: &Path) -> Result<PathBuf, ArtifactError> {
  let parent = package_dir.parent().unwrap_or(Path::new("."));
  std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Stage {
    path: parent.to_path_buf(),
    source,
  })?;

  let staging = tempfile::Builder::new()
    .prefix(".staging-")
    .tempdir_in(parent)
    .map_err(|source| ArtifactError::Stage {
      path: parent.to_path_buf(),
      source,
    })?;
  set.copy_into(staging.path())?;

  if package_dir.exists() {
    std::fs::remove_dir_all(package_dir).map_err(|source| ArtifactError::Stage {
      path: package_dir.to_path_buf(),
      source,
    })?;
  }
  std::fs::rename(staging.path(), package_dir).map_err(|source| ArtifactError::Stage {
    path: package_dir.to_path_buf(),
    source,
  })?;

  info!(path = ?package_dir, files = set.len(), "package installed");
  Ok(package_dir.to_path_buf())
}

/// Copy `set` into a consumer's tree, keeping relative paths.
pub fn deploy(set: &ArtifactSet, target: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
  let written = set.copy_into(target)?;
  info!(path = ?target, files = written.len(), "deployed artifacts");
  Ok(written)
}
