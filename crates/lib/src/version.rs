//! Package version discovery.
//!
//! A recipe never states its own version. The version is read from a build
//! manifest in the project (normally `CMakeLists.txt`) so that file stays the
//! single source of truth.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("manifest not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("no version declared in {}", path.display())]
  NoVersion { path: PathBuf },

  #[error("invalid version '{value}' in {}", path.display())]
  InvalidVersion { path: PathBuf, value: String },
}

/// A validated version string: 1 to 4 numeric components plus an optional
/// `-prerelease` suffix, e.g. `1.4.0` or `2.0.0.12-rc1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
  pub fn parse(value: &str) -> Option<Self> {
    let (core, pre) = match value.split_once('-') {
      Some((core, pre)) => (core, Some(pre)),
      None => (value, None),
    };

    let components: Vec<&str> = core.split('.').collect();
    if components.is_empty() || components.len() > 4 {
      return None;
    }
    if !components
      .iter()
      .all(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()))
    {
      return None;
    }

    if let Some(pre) = pre
      && (pre.is_empty() || !pre.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-'))
    {
      return None;
    }

    Some(Self(value.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Extracts a version from a manifest file.
pub trait VersionSource: Send + Sync {
  fn read_version(&self, manifest_path: &Path) -> Result<Version, ManifestError>;
}

/// Pick the reader matching a manifest's file name.
pub fn source_for(manifest_path: &Path) -> Box<dyn VersionSource> {
  let is_cmake = manifest_path
    .file_name()
    .and_then(|n| n.to_str())
    .is_some_and(|n| n.eq_ignore_ascii_case("CMakeLists.txt"));

  if is_cmake {
    Box::new(CMakeVersionSource)
  } else {
    Box::new(PlainVersionSource)
  }
}

fn read_manifest(path: &Path) -> Result<String, ManifestError> {
  std::fs::read_to_string(path).map_err(|source| {
    if source.kind() == io::ErrorKind::NotFound {
      ManifestError::NotFound { path: path.to_path_buf() }
    } else {
      ManifestError::Read {
        path: path.to_path_buf(),
        source,
      }
    }
  })
}

fn validate(path: &Path, raw: &str) -> Result<Version, ManifestError> {
  Version::parse(raw).ok_or_else(|| ManifestError::InvalidVersion {
    path: path.to_path_buf(),
    value: raw.to_string(),
  })
}

/// Reads `project(<name> VERSION <x.y.z> ...)` from a CMake listfile.
#[derive(Debug, Default, Clone, Copy)]
pub struct CMakeVersionSource;

impl VersionSource for CMakeVersionSource {
  fn read_version(&self, manifest_path: &Path) -> Result<Version, ManifestError> {
    let content = read_manifest(manifest_path)?;
    let raw = cmake_project_version(&content).ok_or_else(|| ManifestError::NoVersion {
      path: manifest_path.to_path_buf(),
    })?;
    let version = validate(manifest_path, &raw)?;
    debug!(path = %manifest_path.display(), version = %version, "read version from CMake project");
    Ok(version)
  }
}

/// Reads the first non-empty line of a plain version file.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainVersionSource;

impl VersionSource for PlainVersionSource {
  fn read_version(&self, manifest_path: &Path) -> Result<Version, ManifestError> {
    let content = read_manifest(manifest_path)?;
    let raw = content
      .lines()
      .map(str::trim)
      .find(|line| !line.is_empty())
      .ok_or_else(|| ManifestError::NoVersion {
        path: manifest_path.to_path_buf(),
      })?;
    validate(manifest_path, raw)
  }
}

/// Length of a bracket opener (`[[`, `[=[`, ...) at the start of `rest`, and
/// its `=` count.
fn bracket_open(rest: &str) -> Option<(usize, usize)> {
  let after = rest.strip_prefix('[')?;
  let equals = after.bytes().take_while(|&b| b == b'=').count();
  after[equals..].starts_with('[').then_some((equals + 2, equals))
}

/// Byte length of the bracket body plus its closer, or all of `body` when the
/// closer is missing.
fn bracket_len(body: &str, equals: usize) -> usize {
  let close = format!("]{}]", "=".repeat(equals));
  body.find(&close).map_or(body.len(), |end| end + close.len())
}

/// Drops `#` line comments and `#[[...]]` bracket comments. Quoted and
/// bracket arguments are copied verbatim, so a `#` inside them survives.
fn strip_comments(content: &str) -> String {
  let mut out = String::with_capacity(content.len());
  let mut rest = content;
  let mut in_quote = false;

  while let Some(c) = rest.chars().next() {
    let mut take = c.len_utf8();
    if in_quote {
      if c == '\\' {
        take += rest[take..].chars().next().map_or(0, char::len_utf8);
      } else if c == '"' {
        in_quote = false;
      }
    } else if c == '"' {
      in_quote = true;
    } else if c == '#' {
      rest = match bracket_open(&rest[1..]) {
        Some((open, equals)) => {
          let body = &rest[1 + open..];
          out.push(' ');
          &body[bracket_len(body, equals)..]
        }
        None => rest.find('\n').map_or("", |end| &rest[end..]),
      };
      continue;
    } else if let Some((open, equals)) = bracket_open(rest) {
      take = open + bracket_len(&rest[open..], equals);
    }
    out.push_str(&rest[..take]);
    rest = &rest[take..];
  }
  out
}

/// Returns the raw `VERSION` argument of the first `project()` command.
fn cmake_project_version(content: &str) -> Option<String> {
  let content = strip_comments(content);
  let lower = content.to_ascii_lowercase();
  let mut search_from = 0;

  while let Some(found) = lower[search_from..].find("project") {
    let start = search_from + found;
    let after = start + "project".len();
    search_from = after;

    let preceded_ok = lower[..start]
      .chars()
      .next_back()
      .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
    let rest = content[after..].trim_start();
    if !preceded_ok || !rest.starts_with('(') {
      continue;
    }

    let args = &rest[1..rest.find(')')?];
    let mut tokens = args.split_whitespace().map(|t| t.trim_matches('"'));
    while let Some(token) = tokens.next() {
      if token == "VERSION" {
        return tokens.next().map(str::to_string);
      }
    }
    return None;
  }

  None
}
