//! Platform descriptors and host detection.
//!
//! A [`Platform`] is the set of build settings an evaluation targets. It is
//! fixed when the evaluation starts and never mutated afterwards.

pub mod arch;
pub mod gate;
pub mod os;
pub mod paths;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use arch::Arch;
pub use gate::PlatformGate;
pub use os::Os;

/// CMake-style build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildType {
  Debug,
  Release,
  RelWithDebInfo,
  MinSizeRel,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "Debug",
      Self::Release => "Release",
      Self::RelWithDebInfo => "RelWithDebInfo",
      Self::MinSizeRel => "MinSizeRel",
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown build type '{0}' (expected Debug, Release, RelWithDebInfo or MinSizeRel)")]
pub struct UnknownBuildType(pub String);

impl FromStr for BuildType {
  type Err = UnknownBuildType;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "debug" => Ok(Self::Debug),
      "release" => Ok(Self::Release),
      "relwithdebinfo" => Ok(Self::RelWithDebInfo),
      "minsizerel" => Ok(Self::MinSizeRel),
      _ => Err(UnknownBuildType(s.to_string())),
    }
  }
}

/// Compiler setting, e.g. `clang 14`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compiler {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
}

impl Compiler {
  pub fn new(name: &str, version: Option<&str>) -> Self {
    Self {
      name: name.to_string(),
      version: version.map(str::to_string),
    }
  }
}

impl fmt::Display for Compiler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.version {
      Some(v) => write!(f, "{} {}", self.name, v),
      None => write!(f, "{}", self.name),
    }
  }
}

/// Names of the platform fields a recipe may declare as identity-relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
  Os,
  Compiler,
  BuildType,
  Arch,
}

impl Setting {
  pub const ALL: [Setting; 4] = [Setting::Os, Setting::Compiler, Setting::BuildType, Setting::Arch];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Os => "os",
      Self::Compiler => "compiler",
      Self::BuildType => "build_type",
      Self::Arch => "arch",
    }
  }
}

/// Platform descriptor `{os, compiler, build_type, arch}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
  pub os: Os,
  pub arch: Arch,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub compiler: Option<Compiler>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build_type: Option<BuildType>,
}

impl Platform {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self {
      os,
      arch,
      compiler: None,
      build_type: None,
    }
  }

  /// Describe the host. Compiler and build type are unknown until the caller
  /// supplies them.
  pub fn current() -> Self {
    Self::new(Os::current(), Arch::current())
  }

  pub fn with_compiler(mut self, compiler: Compiler) -> Self {
    self.compiler = Some(compiler);
    self
  }

  pub fn with_build_type(mut self, build_type: BuildType) -> Self {
    self.build_type = Some(build_type);
    self
  }

  /// Render the requested settings as a sorted `name -> value` map.
  ///
  /// Unset settings are omitted rather than rendered as empty strings, so adding
  /// a compiler to a descriptor always changes the view.
  pub fn settings_view(&self, settings: &[Setting]) -> BTreeMap<String, String> {
    let mut view = BTreeMap::new();
    for setting in settings {
      let value = match setting {
        Setting::Os => Some(self.os.to_string()),
        Setting::Arch => Some(self.arch.to_string()),
        Setting::Compiler => self.compiler.as_ref().map(|c| c.to_string()),
        Setting::BuildType => self.build_type.map(|b| b.to_string()),
      };
      if let Some(value) = value {
        view.insert(setting.as_str().to_string(), value);
      }
    }
    view
  }

  /// Short `os-arch` label used in logs.
  pub fn label(&self) -> String {
    format!("{}-{}", self.os, self.arch)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "os={} arch={}", self.os, self.arch)?;
    if let Some(compiler) = &self.compiler {
      write!(f, " compiler={}", compiler)?;
    }
    if let Some(build_type) = &self.build_type {
      write!(f, " build_type={}", build_type)?;
    }
    Ok(())
  }
}
