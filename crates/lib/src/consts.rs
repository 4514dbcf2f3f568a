//! Crate-wide constants.

/// Application name, used for directory names and env var prefixes.
pub const APP_NAME: &str = "kiln";

/// Length of the truncated hex digest used for identities and store paths.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Default recipe file name looked up in a project root.
pub const RECIPE_FILENAME: &str = "recipe.lua";

/// Marker file written into a build directory once the build completed.
pub const BUILD_COMPLETE_MARKER: &str = ".kiln-complete";

/// Version of kiln itself, folded into every build identity.
pub const KILN_VERSION: &str = env!("CARGO_PKG_VERSION");
