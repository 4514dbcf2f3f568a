//! The lifecycle hooks.
//!
//! Each hook reads what it needs from the context, calls the base capability,
//! registry or build adapter at most once, and returns the context extended
//! with its result.

use tracing::{debug, info};

use crate::artifact::{self, ArtifactSelector};
use crate::build::lock::BuildLock;
use crate::build::realize::realize;
use crate::build::{BuildInvoker, BuildRequest};
use crate::error::RecipeError;
use crate::eval::{EvaluationContext, Evaluator, Hook, Packaged, StoreKeys};
use crate::identity::IdentityComputer;
use crate::pins::PinSet;
use crate::platform::PlatformGate;
use crate::registry::resolve_all;

impl<B: BuildInvoker> Evaluator<B> {
  pub(super) fn init(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    self.base.setup(&self.recipe, &self.recipe_path)?;
    let options = self.recipe.default_options.with_overrides(
      ctx
        .request()
        .options
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str())),
    )?;
    debug!(?options, "resolved options");
    Ok(ctx.with_options(options))
  }

  pub(super) fn validate(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    PlatformGate::from(self.recipe.supported_os.clone()).validate(ctx.platform())?;
    Ok(ctx)
  }

  pub(super) fn set_version(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let version = self.base.set_version(&self.project_root, &self.recipe)?;
    info!(recipe = %self.recipe.name, version = %version, "version set");
    let computer = IdentityComputer::new(&self.recipe.name, version.clone(), &self.recipe.settings)
      .with_abi_inputs(ctx.request().abi_inputs.clone());
    Ok(ctx.with_version(version, computer))
  }

  pub(super) fn build_requirements(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let mut pins = PinSet::with_common(self.base.common_pins());
    pins.extend(self.recipe.build_requires.iter().cloned());
    debug!(declared = pins.len(), effective = pins.effective().len(), "assembled pins");
    Ok(ctx.with_pins(pins))
  }

  pub(super) async fn build(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let hook = Hook::Build;
    let options = *ctx.options(hook)?;
    let pins = ctx.pins(hook)?;
    let computer = ctx.computer(hook)?;
    let platform = ctx.platform();

    let keys = StoreKeys {
      package_id: self.base.package_id(computer, platform, pins, &options)?,
      build_id: self
        .base
        .build_id(computer, platform, pins, &options, &ctx.request().build_inputs)?,
    };
    let dependencies = resolve_all(self.registry.as_ref(), &pins.resolved_order())?;

    let request = BuildRequest {
      recipe: self.recipe.name.clone(),
      source_dir: self.project_root.clone(),
      output_dir: self.store.build_dir(&keys.build_id),
      platform: platform.clone(),
      options,
      dependencies,
    };
    let realized = realize(&self.invoker, &self.store, request, &keys.build_id, &keys.package_id).await?;
    Ok(ctx.with_output(keys, realized))
  }

  pub(super) async fn package(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let hook = Hook::Package;
    let output = ctx.output(hook)?;
    let keys = ctx.store_keys(hook)?;

    let _lock = BuildLock::acquire(&self.store.lock_path(&keys.package_id), &self.recipe.name).await?;
    let artifacts = ArtifactSelector::from_recipe(&self.recipe).select_package(&output.tree)?;
    let dir = artifact::install_package(&artifacts, &self.store.package_dir(&keys.package_id))?;
    Ok(ctx.with_packaged(Packaged { dir, artifacts }))
  }

  pub(super) fn package_id(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let hook = Hook::PackageId;
    let id = self
      .base
      .package_id(ctx.computer(hook)?, ctx.platform(), ctx.pins(hook)?, ctx.options(hook)?)?;
    info!(recipe = %self.recipe.name, package_id = %id, "package identity");
    Ok(ctx.with_package_id(id))
  }

  pub(super) fn build_id(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let hook = Hook::BuildId;
    let id = self.base.build_id(
      ctx.computer(hook)?,
      ctx.platform(),
      ctx.pins(hook)?,
      ctx.options(hook)?,
      &ctx.request().build_inputs,
    )?;
    info!(recipe = %self.recipe.name, build_id = %id, "build identity");
    Ok(ctx.with_build_id(id))
  }

  pub(super) fn deploy(&self, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let Some(target) = ctx.request().deploy_dir.clone() else {
      debug!("no deploy directory requested");
      return Ok(ctx);
    };
    let output = ctx.output(Hook::Deploy)?;
    let artifacts = ArtifactSelector::from_recipe(&self.recipe).select_deploy(&output.tree)?;
    let deployed = artifact::deploy(&artifacts, &target)?;
    Ok(ctx.with_deployed(deployed))
  }
}
