use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RecipeError;
use crate::pins::DependencyPin;
use crate::platform::{Os, Setting};

/// ABI-affecting build options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
  pub shared: bool,
  #[serde(rename = "fPIC")]
  pub fpic: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      shared: false,
      fpic: true,
    }
  }
}

impl BuildOptions {
  pub const NAMES: [&'static str; 2] = ["shared", "fPIC"];

  /// Apply `name=value` overrides, e.g. from `-O shared=true`.
  pub fn with_overrides<'a>(
    mut self,
    overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
  ) -> Result<Self, RecipeError> {
    for (name, raw) in overrides {
      let value = parse_bool(raw).ok_or_else(|| RecipeError::InvalidOption {
        name: name.to_string(),
        message: format!("expected true or false, got '{}'", raw),
      })?;
      match name {
        "shared" => self.shared = value,
        "fPIC" | "fpic" => self.fpic = value,
        _ => {
          return Err(RecipeError::InvalidOption {
            name: name.to_string(),
            message: format!("unknown option (known: {})", Self::NAMES.join(", ")),
          });
        }
      }
    }
    Ok(self)
  }

  /// CMake cache entries for these options.
  pub fn cmake_definitions(&self) -> BTreeMap<String, String> {
    let on_off = |b: bool| if b { "ON" } else { "OFF" }.to_string();
    BTreeMap::from([
      ("BUILD_SHARED_LIBS".to_string(), on_off(self.shared)),
      ("CMAKE_POSITION_INDEPENDENT_CODE".to_string(), on_off(self.fpic)),
    ])
  }
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw.to_ascii_lowercase().as_str() {
    "true" | "1" | "on" | "yes" => Some(true),
    "false" | "0" | "off" | "no" => Some(false),
    _ => None,
  }
}

/// One copy instruction: files under `src` matching `pattern` land in `dst`.
///
/// `pattern` is matched against paths relative to `src`, so `*` also matches
/// nested files. A pattern without glob metacharacters names a single file and
/// must exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
  pub pattern: String,
  #[serde(default)]
  pub src: String,
  #[serde(default)]
  pub dst: String,
  #[serde(default)]
  pub required: bool,
}

impl CopyRule {
  pub fn new(pattern: &str, src: &str, dst: &str) -> Self {
    Self {
      pattern: pattern.to_string(),
      src: src.to_string(),
      dst: dst.to_string(),
      required: false,
    }
  }

  pub fn is_literal(&self) -> bool {
    !self.pattern.contains(['*', '?', '['])
  }

  pub fn must_match(&self) -> bool {
    self.required || self.is_literal()
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CopyRuleDecl {
  Pattern(String),
  Rule(CopyRule),
}

fn deserialize_rules<'de, D>(deserializer: D) -> Result<Vec<CopyRule>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let decls = Vec::<CopyRuleDecl>::deserialize(deserializer)?;
  Ok(
    decls
      .into_iter()
      .map(|decl| match decl {
        CopyRuleDecl::Pattern(pattern) => CopyRule::new(&pattern, "", ""),
        CopyRuleDecl::Rule(rule) => rule,
      })
      .collect(),
  )
}

fn default_settings() -> Vec<Setting> {
  Setting::ALL.to_vec()
}

fn default_version_file() -> String {
  "CMakeLists.txt".to_string()
}

/// The typed form of a recipe file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDef {
  pub name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  /// The single OS this recipe can be built for; `None` accepts any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub supported_os: Option<Os>,

  /// Platform fields that distinguish packages.
  #[serde(default = "default_settings")]
  pub settings: Vec<Setting>,

  #[serde(default)]
  pub default_options: BuildOptions,

  /// Manifest holding the version, relative to the project root.
  #[serde(default = "default_version_file")]
  pub version_file: String,

  #[serde(default)]
  pub build_requires: Vec<DependencyPin>,

  #[serde(default, deserialize_with = "deserialize_rules")]
  pub package: Vec<CopyRule>,

  /// Patterns collected from anywhere in the output tree for local deployment.
  #[serde(default, deserialize_with = "deserialize_rules")]
  pub deploy: Vec<CopyRule>,
}

impl RecipeDef {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      description: None,
      supported_os: None,
      settings: default_settings(),
      default_options: BuildOptions::default(),
      version_file: default_version_file(),
      build_requires: Vec::new(),
      package: Vec::new(),
      deploy: Vec::new(),
    }
  }
}
