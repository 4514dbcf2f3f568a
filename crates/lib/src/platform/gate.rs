//! Build-eligibility check.

use tracing::debug;

use crate::error::RecipeError;
use crate::platform::{Os, Platform};

/// Rejects platforms whose OS differs from the single OS a recipe supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformGate {
  allowed: Option<Os>,
}

impl PlatformGate {
  pub fn new(allowed: Os) -> Self {
    Self { allowed: Some(allowed) }
  }

  /// A gate that accepts every platform.
  pub fn unrestricted() -> Self {
    Self { allowed: None }
  }

  pub fn allowed(&self) -> Option<&Os> {
    self.allowed.as_ref()
  }

  /// Only `platform.os` is consulted.
  pub fn validate(&self, platform: &Platform) -> Result<(), RecipeError> {
    let Some(allowed) = &self.allowed else {
      return Ok(());
    };

    if platform.os != *allowed {
      return Err(RecipeError::UnsupportedPlatform {
        os: platform.os.clone(),
        allowed: allowed.clone(),
      });
    }

    debug!(platform = %platform, "platform accepted");
    Ok(())
  }
}

impl From<Option<Os>> for PlatformGate {
  fn from(allowed: Option<Os>) -> Self {
    Self { allowed }
  }
}
