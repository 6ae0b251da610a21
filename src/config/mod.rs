// src/config/mod.rs

//! Configuration loading and validation for devloop.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load the optional project config and merge CLI overrides (`loader.rs`).
//! - Validate and resolve everything into [`Settings`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_from_path, load_settings};
pub use model::{
    BuildSettings, DocsSettings, RawConfigFile, ServerSettings, Settings, WatchSettings,
    staged_path_for,
};
pub use validate::resolve_settings;
