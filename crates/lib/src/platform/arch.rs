use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU architecture setting of a platform descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Arch {
  X86_64,
  Aarch64,
  Wasm,
  Other(String),
}

impl Arch {
  /// Detect the host CPU architecture.
  pub fn current() -> Self {
    Self::from(std::env::consts::ARCH)
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "armv8",
      Self::Wasm => "wasm",
      Self::Other(name) => name,
    }
  }
}

impl From<&str> for Arch {
  fn from(value: &str) -> Self {
    match value.to_ascii_lowercase().as_str() {
      "x86_64" | "amd64" => Self::X86_64,
      "aarch64" | "arm64" | "armv8" => Self::Aarch64,
      "wasm" | "wasm32" => Self::Wasm,
      _ => Self::Other(value.to_string()),
    }
  }
}

impl From<String> for Arch {
  fn from(value: String) -> Self {
    Self::from(value.as_str())
  }
}

impl From<Arch> for String {
  fn from(arch: Arch) -> Self {
    arch.as_str().to_string()
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
