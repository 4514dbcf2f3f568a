use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating system setting of a platform descriptor.
///
/// Names follow the conventional build-setting spelling (`Linux`, `Macos`,
/// `Windows`, `Emscripten`). Anything else is kept verbatim in `Other` so a gate
/// can still report exactly what it observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Os {
  Linux,
  Macos,
  Windows,
  Emscripten,
  Other(String),
}

impl Os {
  /// Detect the host operating system.
  pub fn current() -> Self {
    Self::from(std::env::consts::OS)
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Linux => "Linux",
      Self::Macos => "Macos",
      Self::Windows => "Windows",
      Self::Emscripten => "Emscripten",
      Self::Other(name) => name,
    }
  }
}

impl From<&str> for Os {
  fn from(value: &str) -> Self {
    match value.to_ascii_lowercase().as_str() {
      "linux" => Self::Linux,
      "macos" | "darwin" => Self::Macos,
      "windows" => Self::Windows,
      "emscripten" => Self::Emscripten,
      _ => Self::Other(value.to_string()),
    }
  }
}

impl From<String> for Os {
  fn from(value: String) -> Self {
    Self::from(value.as_str())
  }
}

impl From<Os> for String {
  fn from(os: Os) -> Self {
    os.as_str().to_string()
  }
}

impl FromStr for Os {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(s))
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
