//! Gantry Core - Foundation types for macOS bundle packaging
//!
//! This crate provides the shared types, error handling, and typed
//! configuration tree used by the signing and packaging crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    find_config, load_config, load_config_from_dir, load_config_or_default, AppConfig, Config,
    IdentityPreference, MacPassConfig,
};
pub use error::{ConfigError, GantryError, Result};
pub use types::{Arch, Artifact, BuildVariant, SigningType};
