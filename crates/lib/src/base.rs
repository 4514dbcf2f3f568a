//! The shared base capability recipes build on.
//!
//! Evaluators receive a [`BaseCapability`] at construction instead of
//! inheriting behavior from a base recipe. Each method backs exactly one
//! lifecycle hook and is called once per evaluation; its results are used
//! as-is.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use tracing::debug;

use crate::error::RecipeError;
use crate::identity::{Identity, IdentityComputer};
use crate::pins::{DependencyPin, PinSet};
use crate::platform::Platform;
use crate::recipe::{BuildOptions, CopyRule, RecipeDef};
use crate::util::hash::HashError;
use crate::version::{self, ManifestError, Version};

pub trait BaseCapability: Send + Sync {
  /// `init`: generic setup and sanity checks on the loaded recipe.
  fn setup(&self, recipe: &RecipeDef, recipe_path: &Path) -> Result<(), RecipeError>;

  /// `set_version`: read the version from the recipe's manifest file.
  fn set_version(&self, project_root: &Path, recipe: &RecipeDef) -> Result<Version, ManifestError> {
    let manifest = project_root.join(&recipe.version_file);
    version::source_for(&manifest).read_version(&manifest)
  }

  /// `build_requirements`: pins every recipe gets before its own.
  fn common_pins(&self) -> Vec<DependencyPin>;

  /// `package_id`: the identity-hash primitive for packages. The build hook
  /// keys the package directory and its lock by this value.
  fn package_id(
    &self,
    computer: &IdentityComputer,
    platform: &Platform,
    pins: &PinSet,
    options: &BuildOptions,
  ) -> Result<Identity, HashError> {
    computer.package_identity(platform, pins, options)
  }

  /// `build_id`: the identity-hash primitive for builds. The build hook keys
  /// the build directory by this value.
  fn build_id(
    &self,
    computer: &IdentityComputer,
    platform: &Platform,
    pins: &PinSet,
    options: &BuildOptions,
    build_inputs: &BTreeMap<String, String>,
  ) -> Result<Identity, HashError> {
    computer.build_identity(platform, pins, options, build_inputs)
  }
}

/// Config-driven base capability.
#[derive(Debug, Clone, Default)]
pub struct StandardBase {
  common_pins: Vec<DependencyPin>,
}

impl StandardBase {
  pub fn new(common_pins: Vec<DependencyPin>) -> Self {
    Self { common_pins }
  }
}

fn check_rules(kind: &str, rules: &[CopyRule], recipe_path: &Path) -> Result<(), RecipeError> {
  for rule in rules {
    let invalid = |message: String| RecipeError::InvalidRecipe {
      path: recipe_path.to_path_buf(),
      message,
    };
    if rule.pattern.trim().is_empty() {
      return Err(invalid(format!("{} rule has an empty pattern", kind)));
    }
    glob::Pattern::new(&rule.pattern)
      .map_err(|e| invalid(format!("{} rule pattern '{}': {}", kind, rule.pattern, e)))?;
    for dir in [&rule.src, &rule.dst] {
      if Path::new(dir).is_absolute() || Path::new(dir).components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid(format!("{} rule directory '{}' must stay inside the tree", kind, dir)));
      }
    }
  }
  Ok(())
}

impl BaseCapability for StandardBase {
  fn setup(&self, recipe: &RecipeDef, recipe_path: &Path) -> Result<(), RecipeError> {
    if recipe.settings.is_empty() {
      return Err(RecipeError::InvalidRecipe {
        path: recipe_path.to_path_buf(),
        message: "settings must name at least one platform field".to_string(),
      });
    }
    check_rules("package", &recipe.package, recipe_path)?;
    check_rules("deploy", &recipe.deploy, recipe_path)?;
    debug!(recipe = %recipe.name, "recipe setup complete");
    Ok(())
  }

  fn common_pins(&self) -> Vec<DependencyPin> {
    self.common_pins.clone()
  }
}
