//! Package and build identities.
//!
//! Both identities are fingerprints of a canonical JSON document, so they are
//! pure functions of their inputs and comparable across machines without any
//! coordination:
//!
//! - the **package identity** covers the recipe reference, the identity-relevant
//!   platform settings, the effective pins and the build options;
//! - the **build identity** covers everything the package identity covers plus
//!   build-time-only inputs such as tool versions.
//!
//! Neither looks at build output, so both can be computed before building to
//! look up caches.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::pins::PinSet;
use crate::platform::{Platform, Setting};
use crate::recipe::BuildOptions;
use crate::util::hash::{Fingerprint, Fingerprintable, HashError};
use crate::version::Version;

/// Opaque identity value.
pub type Identity = Fingerprint;

/// Which of the two identities is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
  Package,
  Build,
}

/// The canonical document behind an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityInputs {
  pub kind: IdentityKind,
  pub name: String,
  pub version: String,
  pub settings: BTreeMap<String, String>,
  pub requires: BTreeMap<String, String>,
  pub options: BuildOptions,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub abi_inputs: BTreeMap<String, String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub build_inputs: BTreeMap<String, String>,
}

impl Fingerprintable for IdentityInputs {}

/// Computes identities for one recipe reference.
#[derive(Debug, Clone)]
pub struct IdentityComputer {
  name: String,
  version: Version,
  settings: Vec<Setting>,
  abi_inputs: BTreeMap<String, String>,
}

impl IdentityComputer {
  pub fn new(name: &str, version: Version, settings: &[Setting]) -> Self {
    Self {
      name: name.to_string(),
      version,
      settings: settings.to_vec(),
      abi_inputs: BTreeMap::new(),
    }
  }

  /// Environment settings that change the ABI, such as the toolchain file.
  /// They enter both identities.
  pub fn with_abi_inputs(mut self, inputs: BTreeMap<String, String>) -> Self {
    self.abi_inputs = inputs;
    self
  }

  pub fn package_inputs(&self, platform: &Platform, pins: &PinSet, options: &BuildOptions) -> IdentityInputs {
    IdentityInputs {
      kind: IdentityKind::Package,
      name: self.name.clone(),
      version: self.version.to_string(),
      settings: platform.settings_view(&self.settings),
      requires: pins.effective(),
      options: *options,
      abi_inputs: self.abi_inputs.clone(),
      build_inputs: BTreeMap::new(),
    }
  }

  pub fn build_inputs(
    &self,
    platform: &Platform,
    pins: &PinSet,
    options: &BuildOptions,
    build_time_inputs: &BTreeMap<String, String>,
  ) -> IdentityInputs {
    IdentityInputs {
      kind: IdentityKind::Build,
      build_inputs: build_time_inputs.clone(),
      ..self.package_inputs(platform, pins, options)
    }
  }

  pub fn package_identity(
    &self,
    platform: &Platform,
    pins: &PinSet,
    options: &BuildOptions,
  ) -> Result<Identity, HashError> {
    self.package_inputs(platform, pins, options).fingerprint()
  }

  pub fn build_identity(
    &self,
    platform: &Platform,
    pins: &PinSet,
    options: &BuildOptions,
    build_time_inputs: &BTreeMap<String, String>,
  ) -> Result<Identity, HashError> {
    self
      .build_inputs(platform, pins, options, build_time_inputs)
      .fingerprint()
  }
}
