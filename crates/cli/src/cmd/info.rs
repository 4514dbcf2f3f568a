use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use kiln_lib::consts::{KILN_VERSION, RECIPE_FILENAME};
use kiln_lib::eval::{EvaluationRequest, Hook};
use kiln_lib::platform::{Platform, paths};

use crate::cmd::{Session, load_config, runtime};
use crate::output::{print_info, print_stat, print_warning};

#[derive(Args, Debug)]
pub struct InfoArgs {
  /// Recipe file or project directory (default: ./recipe.lua if present)
  pub recipe: Option<PathBuf>,
}

pub fn cmd_info(args: InfoArgs, config: Option<&Path>) -> Result<()> {
  let cfg = load_config(config)?;

  print_info(&format!("kiln {}", KILN_VERSION));
  print_stat("Platform", &Platform::current().label());
  print_stat("Store", &cfg.store_dir().display().to_string());
  print_stat("Registry", &cfg.registry_dir().display().to_string());
  print_stat(
    "Config",
    &config.map(Path::to_path_buf).unwrap_or_else(paths::config_file).display().to_string(),
  );

  let recipe = match args.recipe {
    Some(path) => path,
    None if Path::new(RECIPE_FILENAME).exists() => PathBuf::from(RECIPE_FILENAME),
    None => return Ok(()),
  };

  let session = Session::open(&recipe, config)?;
  let def = session.evaluator.recipe();

  println!();
  print_info(&format!("Recipe {}", def.name));
  if let Some(description) = &def.description {
    print_stat("Description", description);
  }
  print_stat("File", &session.recipe_path.display().to_string());
  print_stat(
    "Supported OS",
    def.supported_os.as_ref().map(|os| os.as_str()).unwrap_or("any"),
  );
  let settings: Vec<_> = def.settings.iter().map(|s| s.as_str()).collect();
  print_stat("Settings", &settings.join(", "));
  print_stat(
    "Options",
    &format!("shared={} fPIC={}", def.default_options.shared, def.default_options.fpic),
  );

  let ctx = runtime()?.block_on(
    session
      .evaluator
      .run_hooks(&[Hook::SetVersion, Hook::BuildRequirements], EvaluationRequest::new(Platform::current())),
  );
  match ctx {
    Ok(ctx) => {
      if let Ok(version) = ctx.version(Hook::SetVersion) {
        print_stat("Version", version.as_str());
      }
      if let Ok(pins) = ctx.pins(Hook::BuildRequirements) {
        for name in pins.overridden() {
          print_warning(&format!("{} is pinned more than once; the last declaration wins", name));
        }
        for pin in pins.resolved_order() {
          print_stat("Requires", &pin.to_string());
        }
      }
    }
    Err(err) => print_warning(&format!("Version unavailable: {}", err)),
  }

  Ok(())
}
