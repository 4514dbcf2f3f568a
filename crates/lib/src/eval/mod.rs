//! Recipe evaluation.
//!
//! An evaluation runs the lifecycle hooks in [`Hook::ORDER`] against one
//! [`EvaluationRequest`], threading an immutable [`EvaluationContext`] from
//! each hook to the next and stopping at the first error.
//!
//! ```text
//! init -> validate -> set_version -> build_requirements -> build
//!      -> package -> package_id -> build_id -> deploy
//! ```
//!
//! `validate` runs before anything touches the registry or the store, so an
//! unsupported platform has no side effects.

mod context;
mod hooks;

pub use context::*;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Instrument, info, info_span, warn};

use crate::base::BaseCapability;
use crate::build::BuildInvoker;
use crate::build::store::Store;
use crate::error::RecipeError;
use crate::identity::Identity;
use crate::recipe::RecipeDef;
use crate::registry::DependencyRegistry;

/// Lifecycle hooks, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
  Init,
  Validate,
  SetVersion,
  BuildRequirements,
  Build,
  Package,
  PackageId,
  BuildId,
  Deploy,
}

impl Hook {
  pub const ORDER: [Hook; 9] = [
    Hook::Init,
    Hook::Validate,
    Hook::SetVersion,
    Hook::BuildRequirements,
    Hook::Build,
    Hook::Package,
    Hook::PackageId,
    Hook::BuildId,
    Hook::Deploy,
  ];

  /// Hooks that never build; enough to report identities.
  pub const IDENTIFY: [Hook; 6] = [
    Hook::Init,
    Hook::Validate,
    Hook::SetVersion,
    Hook::BuildRequirements,
    Hook::PackageId,
    Hook::BuildId,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Hook::Init => "init",
      Hook::Validate => "validate",
      Hook::SetVersion => "set_version",
      Hook::BuildRequirements => "build_requirements",
      Hook::Build => "build",
      Hook::Package => "package",
      Hook::PackageId => "package_id",
      Hook::BuildId => "build_id",
      Hook::Deploy => "deploy",
    }
  }
}

impl fmt::Display for Hook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Package and build identities without building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identities {
  pub package_id: Identity,
  pub build_id: Identity,
}

/// Evaluates one recipe.
pub struct Evaluator<B> {
  recipe: RecipeDef,
  recipe_path: PathBuf,
  project_root: PathBuf,
  base: Arc<dyn BaseCapability>,
  registry: Arc<dyn DependencyRegistry>,
  invoker: B,
  store: Store,
}

impl<B: BuildInvoker> Evaluator<B> {
  /// The project root is the directory holding the recipe file.
  pub fn new(
    recipe: RecipeDef,
    recipe_path: &Path,
    base: Arc<dyn BaseCapability>,
    registry: Arc<dyn DependencyRegistry>,
    invoker: B,
    store: Store,
  ) -> Self {
    let project_root = recipe_path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
    Self {
      recipe,
      recipe_path: recipe_path.to_path_buf(),
      project_root,
      base,
      registry,
      invoker,
      store,
    }
  }

  pub fn recipe(&self) -> &RecipeDef {
    &self.recipe
  }

  /// Run `hooks` in the given order, stopping at the first failure.
  pub async fn run_hooks(&self, hooks: &[Hook], request: EvaluationRequest) -> Result<EvaluationContext, RecipeError> {
    let mut ctx = EvaluationContext::new(request);
    for &hook in hooks {
      let span = info_span!("hook", recipe = %self.recipe.name, hook = %hook);
      ctx = self.run_hook(hook, ctx).instrument(span).await?;
    }
    Ok(ctx)
  }

  /// Run one hook against `ctx`.
  pub async fn run_hook(&self, hook: Hook, ctx: EvaluationContext) -> Result<EvaluationContext, RecipeError> {
    let ctx = match hook {
      Hook::Init => self.init(ctx)?,
      Hook::Validate => self.validate(ctx)?,
      Hook::SetVersion => self.set_version(ctx)?,
      Hook::BuildRequirements => self.build_requirements(ctx)?,
      Hook::Build => self.build(ctx).await?,
      Hook::Package => self.package(ctx).await?,
      Hook::PackageId => self.package_id(ctx)?,
      Hook::BuildId => self.build_id(ctx)?,
      Hook::Deploy => self.deploy(ctx)?,
    };
    Ok(ctx.completing(hook))
  }

  /// Run the full lifecycle.
  pub async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationReport, RecipeError> {
    info!(recipe = %self.recipe.name, platform = %request.platform, "evaluating recipe");
    let ctx = self.run_hooks(&Hook::ORDER, request).await?;
    EvaluationReport::from_context(&self.recipe.name, &ctx)
  }

  /// Compute both identities without building.
  pub async fn identities(&self, request: EvaluationRequest) -> Result<Identities, RecipeError> {
    let ctx = self.run_hooks(&Hook::IDENTIFY, request).await?;
    Ok(Identities {
      package_id: ctx.package_id(Hook::BuildId)?.clone(),
      build_id: ctx.build_id(Hook::BuildId)?.clone(),
    })
  }
}

impl<B: BuildInvoker + 'static> Evaluator<B> {
  /// Evaluate independent requests concurrently. Results are in request order.
  ///
  /// Requests that share a deploy directory fail with
  /// [`RecipeError::DeployConflict`] without running.
  pub async fn evaluate_all(
    self: &Arc<Self>,
    requests: Vec<EvaluationRequest>,
  ) -> Vec<Result<EvaluationReport, RecipeError>> {
    let mut deploy_dirs: HashMap<PathBuf, usize> = HashMap::new();
    for dir in requests.iter().filter_map(|r| r.deploy_dir.as_ref()) {
      *deploy_dirs.entry(dir.clone()).or_default() += 1;
    }

    let mut results: Vec<Option<Result<EvaluationReport, RecipeError>>> = Vec::new();
    results.resize_with(requests.len(), || None);
    let mut tasks = JoinSet::new();
    for (index, request) in requests.into_iter().enumerate() {
      if let Some(dir) = request.deploy_dir.as_ref().filter(|dir| deploy_dirs[*dir] > 1) {
        warn!(deploy_dir = %dir.display(), platform = %request.platform, "deploy directory conflict");
        results[index] = Some(Err(RecipeError::DeployConflict { dir: dir.clone() }));
        continue;
      }
      let evaluator = Arc::clone(self);
      tasks.spawn(async move { (index, evaluator.evaluate(request).await) });
    }

    while let Some(joined) = tasks.join_next().await {
      let (index, result) = match joined {
        Ok(done) => done,
        Err(e) => std::panic::resume_unwind(e.into_panic()),
      };
      results[index] = Some(result);
    }
    results.into_iter().flatten().collect()
  }
}
