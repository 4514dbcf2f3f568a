//! Realizing a build: lock, reuse or invoke, mark complete.

use tokio::fs;
use tracing::{debug, info};

use crate::build::lock::BuildLock;
use crate::build::marker::{is_reusable, write_marker};
use crate::build::store::{Store, StoreError};
use crate::build::{BuildInvoker, BuildRequest, OutputTree};
use crate::error::RecipeError;
use crate::identity::Identity;

/// Outcome of [`realize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Realized {
  pub tree: OutputTree,
  /// True when a previous build's output was reused and nothing was invoked.
  pub cached: bool,
}

/// Produce the output tree for `build_id`.
///
/// Holds the package identity's lock for the whole call, so concurrent
/// evaluations of the same identity build at most once; the others find the
/// completion marker and reuse the output. `request.output_dir` is replaced
/// with the store's build directory.
pub async fn realize<B: BuildInvoker>(
  invoker: &B,
  store: &Store,
  mut request: BuildRequest,
  build_id: &Identity,
  package_id: &Identity,
) -> Result<Realized, RecipeError> {
  let _lock = BuildLock::acquire(&store.lock_path(package_id), &request.recipe).await?;

  let build_dir = store.build_dir(build_id);
  if is_reusable(&build_dir, build_id) {
    info!(recipe = %request.recipe, build_id = %build_id, "reusing completed build");
    return Ok(Realized {
      tree: OutputTree::new(build_dir),
      cached: true,
    });
  }

  if build_dir.exists() {
    debug!(path = ?build_dir, "removing incomplete build");
    fs::remove_dir_all(&build_dir)
      .await
      .map_err(|e| StoreError::io(&build_dir, e))?;
  }
  fs::create_dir_all(&build_dir)
    .await
    .map_err(|e| StoreError::io(&build_dir, e))?;

  info!(recipe = %request.recipe, build_id = %build_id, platform = %request.platform, "building");
  request.output_dir = build_dir.clone();
  let tree = invoker.invoke(&request).await?;

  write_marker(&build_dir, build_id, package_id)?;
  Ok(Realized { tree, cached: false })
}
