//! Configuration loading, env substitution, and validation.
//!
//! Config files: `nowplay.toml`, `nowplay.yaml`, or `nowplay.json`,
//! searched in `./` then `~/.config/nowplay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, clear_config_dir, config_dir, discover_and_load, find_config_file,
        load_config, set_config_dir, token_path,
    },
    schema::{ApiConfig, NowplayConfig, OAuthSection, PollConfig, StorageConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
