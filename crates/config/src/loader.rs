use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{
    Error, Result,
    error::Context,
    env_subst::substitute_env,
    schema::NowplayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "nowplay.toml",
    "nowplay.yaml",
    "nowplay.yml",
    "nowplay.json",
];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Point the user-global config directory somewhere else (`--config-dir`).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Drop a previous [`set_config_dir`] override.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Returns the user-global config directory.
///
/// Resolution order:
/// 1. programmatic override ([`set_config_dir`])
/// 2. `~/.config/nowplay` (platform equivalent via `directories`)
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "nowplay").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<NowplayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply
/// `NOWPLAY_*` environment overrides.
///
/// Search order:
/// 1. `./nowplay.{toml,yaml,yml,json}` (project-local)
/// 2. `<config_dir>/nowplay.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `NowplayConfig::default()` if no file is found or the file
/// fails to parse.
pub fn discover_and_load() -> NowplayConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                NowplayConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            NowplayConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Override individual fields from `NOWPLAY_*` environment variables.
pub fn apply_env_overrides(config: &mut NowplayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut NowplayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("NOWPLAY_CLIENT_ID") {
        config.oauth.client_id = v;
    }
    if let Some(v) = lookup("NOWPLAY_AUTH_URL") {
        config.oauth.auth_url = v;
    }
    if let Some(v) = lookup("NOWPLAY_TOKEN_URL") {
        config.oauth.token_url = v;
    }
    if let Some(v) = lookup("NOWPLAY_REDIRECT_URI") {
        config.oauth.redirect_uri = v;
    }
    if let Some(v) = lookup("NOWPLAY_API_BASE_URL") {
        config.api.base_url = v;
    }
}

/// Token file location for `config`.
pub fn token_path(config: &NowplayConfig) -> PathBuf {
    config.storage.token_path.clone().unwrap_or_else(|| {
        config_dir()
            .unwrap_or_else(|| PathBuf::from(".config/nowplay"))
            .join("tokens.json")
    })
}

fn parse_config(raw: &str, path: &Path) -> Result<NowplayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
