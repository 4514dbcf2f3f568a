//! Recipe definitions.
//!
//! A recipe is a Lua file returning a plain table. It is evaluated once, turned
//! into a [`RecipeDef`] and never consulted as Lua again.
//!
//! # Submodules
//!
//! - [`lua`] - loading `recipe.lua` files
//! - `types` - the typed recipe model

pub mod lua;
mod types;

pub use types::*;
