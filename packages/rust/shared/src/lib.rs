//! Shared types, error model, and configuration for sheetbind.
//!
//! This crate is the foundation depended on by all other sheetbind crates.
//! It provides:
//! - [`SheetbindError`]: the unified error type
//! - Domain types ([`ContentMap`], [`CacheEntry`], [`TabularResponse`])
//! - Configuration ([`AppConfig`], [`SheetSource`], [`CacheSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BindingConfig, CacheConfig, CacheSettings, SheetConfig, SheetSource, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SheetbindError};
pub use types::{CacheEntry, ContentMap, TabularResponse};
