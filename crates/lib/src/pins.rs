//! Build-time dependency pins.
//!
//! Pins are declared as an ordered sequence (common pins from the base
//! capability first, then the recipe's own) but consumed as a name -> version
//! mapping. When a name repeats, the later declaration wins.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinError {
  #[error("invalid dependency reference '{0}' (expected name/version)")]
  Malformed(String),

  #[error("dependency pin has an empty {field}")]
  Empty { field: &'static str },

  #[error("dependency pin {field} '{value}' must be a single path component")]
  NotAComponent { field: &'static str, value: String },
}

/// Pins name registry directories, so each field must stay one path component.
fn check_component(field: &'static str, value: &str) -> Result<(), PinError> {
  if value.is_empty() {
    return Err(PinError::Empty { field });
  }
  if value == "." || value == ".." || value.contains(['/', '\\']) {
    return Err(PinError::NotAComponent {
      field,
      value: value.to_string(),
    });
  }
  Ok(())
}

/// A fixed `(name, version)` build-time requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PinDecl")]
pub struct DependencyPin {
  pub name: String,
  pub version: String,
}

impl DependencyPin {
  pub fn new(name: &str, version: &str) -> Result<Self, PinError> {
    let name = name.trim();
    let version = version.trim();
    check_component("name", name)?;
    check_component("version", version)?;
    Ok(Self {
      name: name.to_string(),
      version: version.to_string(),
    })
  }
}

impl FromStr for DependencyPin {
  type Err = PinError;

  /// Parses a `name/version` reference.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (name, version) = s.split_once('/').ok_or_else(|| PinError::Malformed(s.to_string()))?;
    if version.contains('/') {
      return Err(PinError::Malformed(s.to_string()));
    }
    Self::new(name, version)
  }
}

impl fmt::Display for DependencyPin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.name, self.version)
  }
}

/// Accepted spellings of a pin in recipe and config files.
#[derive(Deserialize)]
#[serde(untagged)]
enum PinDecl {
  Reference(String),
  Table { name: String, version: String },
}

impl TryFrom<PinDecl> for DependencyPin {
  type Error = PinError;

  fn try_from(decl: PinDecl) -> Result<Self, Self::Error> {
    match decl {
      PinDecl::Reference(reference) => reference.parse(),
      PinDecl::Table { name, version } => Self::new(&name, &version),
    }
  }
}

/// Ordered pin declarations for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PinSet {
  pins: Vec<DependencyPin>,
}

impl PinSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from the base capability's common pins.
  pub fn with_common(common: impl IntoIterator<Item = DependencyPin>) -> Self {
    Self {
      pins: common.into_iter().collect(),
    }
  }

  pub fn add_pin(&mut self, name: &str, version: &str) -> Result<(), PinError> {
    self.push(DependencyPin::new(name, version)?);
    Ok(())
  }

  pub fn push(&mut self, pin: DependencyPin) {
    if let Some(previous) = self.pins.iter().rev().find(|p| p.name == pin.name) {
      warn!(
        name = %pin.name,
        previous = %previous.version,
        version = %pin.version,
        "dependency pinned more than once, later declaration wins"
      );
    }
    self.pins.push(pin);
  }

  /// Every declaration, in order, duplicates included.
  pub fn declared(&self) -> &[DependencyPin] {
    &self.pins
  }

  /// The effective name -> version mapping (last write wins).
  pub fn effective(&self) -> BTreeMap<String, String> {
    self
      .pins
      .iter()
      .map(|p| (p.name.clone(), p.version.clone()))
      .collect()
  }

  /// Effective pins in first-declaration order, for handing to the registry.
  pub fn resolved_order(&self) -> Vec<DependencyPin> {
    let effective = self.effective();
    let mut seen = std::collections::BTreeSet::new();
    self
      .pins
      .iter()
      .filter(|p| seen.insert(p.name.as_str()))
      .map(|p| DependencyPin {
        name: p.name.clone(),
        version: effective[&p.name].clone(),
      })
      .collect()
  }

  /// Names declared more than once.
  pub fn overridden(&self) -> Vec<&str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for pin in &self.pins {
      *counts.entry(pin.name.as_str()).or_default() += 1;
    }
    counts.into_iter().filter(|(_, n)| *n > 1).map(|(name, _)| name).collect()
  }

  pub fn len(&self) -> usize {
    self.pins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pins.is_empty()
  }
}

impl Extend<DependencyPin> for PinSet {
  fn extend<T: IntoIterator<Item = DependencyPin>>(&mut self, iter: T) {
    for pin in iter {
      self.push(pin);
    }
  }
}
