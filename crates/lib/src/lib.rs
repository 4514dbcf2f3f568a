//! kiln-lib: recipe evaluation for native builds.
//!
//! A recipe declares how one artifact is validated, versioned, built,
//! identified and packaged. This crate provides:
//! - `recipe`: loading `recipe.lua` files into [`recipe::RecipeDef`]
//! - `platform`: platform descriptors and the supported-OS gate
//! - `pins` / `registry`: build-time dependency pins and their resolution
//! - `identity`: package and build identities
//! - `build`: the external build adapter, store layout and build caching
//! - `artifact`: package and deploy artifact selection
//! - `eval`: the lifecycle hook pipeline tying it all together

pub mod artifact;
pub mod base;
pub mod build;
pub mod config;
pub mod consts;
pub mod error;
pub mod eval;
pub mod identity;
pub mod pins;
pub mod platform;
pub mod recipe;
pub mod registry;
pub mod util;
pub mod version;
