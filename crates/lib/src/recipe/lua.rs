//! Loading `recipe.lua` files.
//!
//! A recipe file is a Lua chunk that returns a table. The chunk runs with a
//! `kiln` global describing the host:
//!
//! - `kiln.os` / `kiln.arch` - host platform names (e.g. `"Linux"`, `"x86_64"`)
//! - `kiln.version` - version of kiln evaluating the recipe
//! - `kiln.dir` - directory containing the recipe file
//!
//! ```lua
//! return {
//!   name = "vstvideoutils",
//!   supported_os = "Emscripten",
//!   default_options = { shared = false, fPIC = true },
//!   build_requires = { "openh264/2.1.0", "ffmpeg/4.2.4", "opencv/4.5.2" },
//!   package = {
//!     { pattern = "*", src = "bin", dst = "wasm" },
//!     { pattern = "VideoUtils.js", src = "src", dst = "wasm" },
//!   },
//!   deploy = { "*.js", "*.wasm" },
//! }
//! ```
//!
//! Empty tables are ambiguous in Lua; leave a field out instead of writing `{}`.

use std::path::{Path, PathBuf};

use mlua::LuaSerdeExt;
use mlua::prelude::*;
use tracing::debug;

use crate::consts::KILN_VERSION;
use crate::error::RecipeError;
use crate::platform::{Arch, Os};
use crate::recipe::RecipeDef;

fn invalid(path: &Path, message: impl ToString) -> RecipeError {
  RecipeError::InvalidRecipe {
    path: path.to_path_buf(),
    message: message.to_string(),
  }
}

fn register_kiln_global(lua: &Lua, dir: &Path) -> LuaResult<()> {
  let kiln = lua.create_table()?;
  kiln.set("os", Os::current().as_str())?;
  kiln.set("arch", Arch::current().as_str())?;
  kiln.set("version", KILN_VERSION)?;
  kiln.set("dir", dir.to_string_lossy().to_string())?;
  lua.globals().set("kiln", kiln)?;
  Ok(())
}

/// Evaluate Lua source into a recipe. `origin` only labels errors and sets
/// `kiln.dir`.
pub fn load_recipe_str(source: &str, origin: &Path) -> Result<RecipeDef, RecipeError> {
  let lua = Lua::new();
  let dir = origin.parent().unwrap_or(Path::new("."));
  register_kiln_global(&lua, dir).map_err(|e| invalid(origin, e))?;

  let value = lua
    .load(source)
    .set_name(format!("@{}", origin.display()))
    .eval::<LuaValue>()
    .map_err(|e| invalid(origin, e))?;

  if !value.is_table() {
    return Err(invalid(origin, "recipe must return a table"));
  }

  let recipe: RecipeDef = lua.from_value(value).map_err(|e| invalid(origin, e))?;
  if recipe.name.trim().is_empty() {
    return Err(invalid(origin, "recipe name must not be empty"));
  }

  debug!(name = %recipe.name, pins = recipe.build_requires.len(), "loaded recipe");
  Ok(recipe)
}

/// Load a recipe file from disk.
pub fn load_recipe(path: &Path) -> Result<RecipeDef, RecipeError> {
  let canonical: PathBuf = dunce::canonicalize(path).map_err(|e| invalid(path, format!("cannot resolve: {}", e)))?;
  let source = std::fs::read_to_string(&canonical).map_err(|e| invalid(&canonical, format!("cannot read: {}", e)))?;
  load_recipe_str(&source, &canonical)
}
