//! Values flowing through the hook pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::artifact::ArtifactSet;
use crate::build::realize::Realized;
use crate::error::RecipeError;
use crate::eval::Hook;
use crate::identity::{Identity, IdentityComputer};
use crate::pins::PinSet;
use crate::platform::Platform;
use crate::recipe::BuildOptions;
use crate::version::Version;

/// What to evaluate a recipe for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
  pub platform: Platform,
  /// `name=value` option overrides, applied in order over the recipe defaults.
  pub options: Vec<(String, String)>,
  /// Build-time-only inputs; part of the build identity only.
  pub build_inputs: BTreeMap<String, String>,
  /// ABI-affecting environment settings; part of both identities.
  pub abi_inputs: BTreeMap<String, String>,
  /// Where `deploy` copies its artifacts. `None` skips deployment.
  pub deploy_dir: Option<PathBuf>,
}

impl EvaluationRequest {
  pub fn new(platform: Platform) -> Self {
    Self {
      platform,
      options: Vec::new(),
      build_inputs: BTreeMap::new(),
      abi_inputs: BTreeMap::new(),
      deploy_dir: None,
    }
  }

  pub fn with_option(mut self, name: &str, value: &str) -> Self {
    self.options.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_build_inputs(mut self, inputs: BTreeMap<String, String>) -> Self {
    self.build_inputs = inputs;
    self
  }

  pub fn with_abi_inputs(mut self, inputs: BTreeMap<String, String>) -> Self {
    self.abi_inputs = inputs;
    self
  }

  pub fn with_deploy_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.deploy_dir = Some(dir.into());
    self
  }
}

/// Store locations computed when building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
  pub package_id: Identity,
  pub build_id: Identity,
}

/// Installed package payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packaged {
  pub dir: PathBuf,
  pub artifacts: ArtifactSet,
}

/// Cross-hook state.
///
/// Hooks never mutate a context; each returns a new one carrying its result.
/// A hook reading a value that an earlier hook did not produce fails with
/// [`RecipeError::HookOutOfOrder`].
#[derive(Debug, Clone)]
pub struct EvaluationContext {
  request: EvaluationRequest,
  completed: Vec<Hook>,
  options: Option<BuildOptions>,
  version: Option<Version>,
  computer: Option<IdentityComputer>,
  pins: Option<PinSet>,
  store_keys: Option<StoreKeys>,
  output: Option<Realized>,
  packaged: Option<Packaged>,
  package_id: Option<Identity>,
  build_id: Option<Identity>,
  deployed: Option<Vec<PathBuf>>,
}

fn require<'a, T>(value: &'a Option<T>, hook: Hook, requires: Hook) -> Result<&'a T, RecipeError> {
  value.as_ref().ok_or(RecipeError::HookOutOfOrder { hook, requires })
}

impl EvaluationContext {
  pub fn new(request: EvaluationRequest) -> Self {
    Self {
      request,
      completed: Vec::new(),
      options: None,
      version: None,
      computer: None,
      pins: None,
      store_keys: None,
      output: None,
      packaged: None,
      package_id: None,
      build_id: None,
      deployed: None,
    }
  }

  pub fn request(&self) -> &EvaluationRequest {
    &self.request
  }

  pub fn platform(&self) -> &Platform {
    &self.request.platform
  }

  pub fn completed(&self) -> &[Hook] {
    &self.completed
  }

  pub(crate) fn completing(mut self, hook: Hook) -> Self {
    self.completed.push(hook);
    self
  }

  pub fn options(&self, hook: Hook) -> Result<&BuildOptions, RecipeError> {
    require(&self.options, hook, Hook::Init)
  }

  pub fn version(&self, hook: Hook) -> Result<&Version, RecipeError> {
    require(&self.version, hook, Hook::SetVersion)
  }

  pub fn computer(&self, hook: Hook) -> Result<&IdentityComputer, RecipeError> {
    require(&self.computer, hook, Hook::SetVersion)
  }

  pub fn pins(&self, hook: Hook) -> Result<&PinSet, RecipeError> {
    require(&self.pins, hook, Hook::BuildRequirements)
  }

  pub fn store_keys(&self, hook: Hook) -> Result<&StoreKeys, RecipeError> {
    require(&self.store_keys, hook, Hook::Build)
  }

  pub fn output(&self, hook: Hook) -> Result<&Realized, RecipeError> {
    require(&self.output, hook, Hook::Build)
  }

  pub fn packaged(&self, hook: Hook) -> Result<&Packaged, RecipeError> {
    require(&self.packaged, hook, Hook::Package)
  }

  pub fn package_id(&self, hook: Hook) -> Result<&Identity, RecipeError> {
    require(&self.package_id, hook, Hook::PackageId)
  }

  pub fn build_id(&self, hook: Hook) -> Result<&Identity, RecipeError> {
    require(&self.build_id, hook, Hook::BuildId)
  }

  pub fn deployed(&self) -> Option<&[PathBuf]> {
    self.deployed.as_deref()
  }

  pub(crate) fn with_options(self, options: BuildOptions) -> Self {
    Self {
      options: Some(options),
      ..self
    }
  }

  pub(crate) fn with_version(self, version: Version, computer: IdentityComputer) -> Self {
    Self {
      version: Some(version),
      computer: Some(computer),
      ..self
    }
  }

  pub(crate) fn with_pins(self, pins: PinSet) -> Self {
    Self { pins: Some(pins), ..self }
  }

  pub(crate) fn with_output(self, keys: StoreKeys, output: Realized) -> Self {
    Self {
      store_keys: Some(keys),
      output: Some(output),
      ..self
    }
  }

  pub(crate) fn with_packaged(self, packaged: Packaged) -> Self {
    Self {
      packaged: Some(packaged),
      ..self
    }
  }

  pub(crate) fn with_package_id(self, id: Identity) -> Self {
    Self {
      package_id: Some(id),
      ..self
    }
  }

  pub(crate) fn with_build_id(self, id: Identity) -> Self {
    Self {
      build_id: Some(id),
      ..self
    }
  }

  pub(crate) fn with_deployed(self, deployed: Vec<PathBuf>) -> Self {
    Self {
      deployed: Some(deployed),
      ..self
    }
  }
}

/// Summary of a completed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
  pub recipe: String,
  pub version: Version,
  pub platform: Platform,
  pub options: BuildOptions,
  pub requires: BTreeMap<String, String>,
  pub package_id: Identity,
  pub build_id: Identity,
  pub build_dir: PathBuf,
  /// True when a previous build was reused.
  pub cached: bool,
  pub package_dir: PathBuf,
  pub packaged: Vec<PathBuf>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub deployed: Vec<PathBuf>,
}

impl EvaluationReport {
  /// Build the report from a context that went through every hook.
  pub fn from_context(recipe: &str, ctx: &EvaluationContext) -> Result<Self, RecipeError> {
    let hook = Hook::Deploy;
    let packaged = ctx.packaged(hook)?;
    let output = ctx.output(hook)?;
    Ok(Self {
      recipe: recipe.to_string(),
      version: ctx.version(hook)?.clone(),
      platform: ctx.platform().clone(),
      options: *ctx.options(hook)?,
      requires: ctx.pins(hook)?.effective(),
      package_id: ctx.package_id(hook)?.clone(),
      build_id: ctx.build_id(hook)?.clone(),
      build_dir: output.tree.root.clone(),
      cached: output.cached,
      package_dir: packaged.dir.clone(),
      packaged: packaged.artifacts.destinations().map(PathBuf::from).collect(),
      deployed: ctx.deployed().map(<[PathBuf]>::to_vec).unwrap_or_default(),
    })
  }
}
