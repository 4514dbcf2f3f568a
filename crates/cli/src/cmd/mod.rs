mod create;
mod id;
mod info;
mod validate;

pub use create::{CreateArgs, cmd_create};
pub use id::{IdArgs, cmd_id};
pub use info::{InfoArgs, cmd_info};
pub use validate::{ValidateArgs, cmd_validate};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use tracing::debug;

use kiln_lib::base::StandardBase;
use kiln_lib::build::cmake::CMakeInvoker;
use kiln_lib::build::store::Store;
use kiln_lib::config::Config;
use kiln_lib::consts::RECIPE_FILENAME;
use kiln_lib::eval::{EvaluationRequest, Evaluator};
use kiln_lib::platform::{Arch, BuildType, Compiler, Os, Platform};
use kiln_lib::recipe::lua::load_recipe;
use kiln_lib::registry::LocalRegistry;

/// Target platform selection shared by the evaluating commands.
#[derive(Args, Debug, Clone)]
pub struct PlatformArgs {
  /// Target OS (default: host OS)
  #[arg(long)]
  pub os: Option<String>,

  /// Target architecture (default: host architecture)
  #[arg(long)]
  pub arch: Option<String>,

  /// Compiler name, e.g. clang
  #[arg(long)]
  pub compiler: Option<String>,

  /// Compiler version
  #[arg(long, requires = "compiler")]
  pub compiler_version: Option<String>,

  /// Build type; repeat to evaluate several at once
  #[arg(long = "build-type", value_name = "TYPE", default_values_t = [BuildType::Release])]
  pub build_types: Vec<BuildType>,

  /// Option override as name=value, e.g. -O shared=true (repeatable)
  #[arg(short = 'O', long = "option", value_name = "NAME=VALUE", value_parser = parse_option)]
  pub options: Vec<(String, String)>,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
    .filter(|(name, _)| !name.is_empty())
    .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

impl PlatformArgs {
  pub fn platforms(&self) -> Vec<Platform> {
    let mut base = Platform::current();
    if let Some(os) = &self.os {
      base.os = Os::from(os.as_str());
    }
    if let Some(arch) = &self.arch {
      base.arch = Arch::from(arch.as_str());
    }
    if let Some(name) = &self.compiler {
      base = base.with_compiler(Compiler::new(name, self.compiler_version.as_deref()));
    }
    self
      .build_types
      .iter()
      .map(|bt| base.clone().with_build_type(*bt))
      .collect()
  }

  /// One request per platform; config options apply before command-line ones.
  pub fn requests(&self, config: &Config) -> Vec<EvaluationRequest> {
    self
      .platforms()
      .into_iter()
      .map(|platform| {
        let mut request = EvaluationRequest::new(platform)
          .with_build_inputs(config.build_inputs())
          .with_abi_inputs(config.abi_inputs());
        request.options.extend(config.options.clone());
        request.options.extend(self.options.iter().cloned());
        request
      })
      .collect()
  }
}

/// Everything a command needs to evaluate one recipe.
pub struct Session {
  pub config: Config,
  pub recipe_path: PathBuf,
  pub evaluator: Arc<Evaluator<CMakeInvoker>>,
}

/// `path` may name the recipe file or the directory holding it.
pub fn recipe_file(path: &Path) -> PathBuf {
  if path.is_dir() {
    path.join(RECIPE_FILENAME)
  } else {
    path.to_path_buf()
  }
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
  match config_path {
    Some(path) => {
      if !path.exists() {
        return Err(anyhow!("Config file not found: {}", path.display()));
      }
      Config::load_from(path)
    }
    None => Config::load(),
  }
  .context("Failed to load configuration")
}

impl Session {
  pub fn open(recipe: &Path, config_path: Option<&Path>) -> Result<Self> {
    let config = load_config(config_path)?;
    let recipe_path = dunce::canonicalize(recipe_file(recipe))
      .with_context(|| format!("Recipe not found: {}", recipe_file(recipe).display()))?;
    let recipe = load_recipe(&recipe_path)?;

    let store = Store::new(config.store_dir());
    debug!(store = ?store.root(), registry = ?config.registry_dir(), "opening session");

    let evaluator = Evaluator::new(
      recipe,
      &recipe_path,
      Arc::new(StandardBase::new(config.common_pins.clone())),
      Arc::new(LocalRegistry::new(config.registry_dir())),
      CMakeInvoker::new(config.cmake.clone()),
      store,
    );

    Ok(Self {
      config,
      recipe_path,
      evaluator: Arc::new(evaluator),
    })
  }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
