use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError, RwLock},
};

use {
    nowplay_common::serialize_option_secret,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
};

use crate::Result;

/// The three persisted slots of the PKCE lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Verifier,
    AccessToken,
    RefreshToken,
}

impl TokenKey {
    pub const ALL: [Self; 3] = [Self::Verifier, Self::AccessToken, Self::RefreshToken];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verifier => "verifier",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value persistence for the verifier and both tokens.
///
/// Writes are last-write-wins. Implementations only lock as much as they
/// need to stay memory safe.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Option<Secret<String>>;
    fn set(&self, key: TokenKey, value: Secret<String>) -> Result<()>;
    fn remove(&self, key: TokenKey) -> Result<()>;

    fn clear(&self) -> Result<()> {
        for key in TokenKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-local store, used by tests and one-shot sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: RwLock<HashMap<TokenKey, Secret<String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<Secret<String>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: TokenKey, value: Secret<String>) -> Result<()> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct Slots {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    verifier: Option<Secret<String>>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    access_token: Option<Secret<String>>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    refresh_token: Option<Secret<String>>,
}

impl Slots {
    fn slot(&mut self, key: TokenKey) -> &mut Option<Secret<String>> {
        match key {
            TokenKey::Verifier => &mut self.verifier,
            TokenKey::AccessToken => &mut self.access_token,
            TokenKey::RefreshToken => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.verifier.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// JSON file store, `<config_dir>/tokens.json` by default.
///
/// Survives process restarts so a callback handled by a later invocation
/// still finds the verifier written before the browser was opened.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current slots. A missing file is empty and so is one that does not
    /// parse; a file that exists but cannot be read is an error, so callers
    /// never rewrite credentials they could not see.
    fn read_slots(&self) -> Result<Slots> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "token file not found");
                return Ok(Slots::default());
            },
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(slots) => Ok(slots),
            Err(e) => {
                warn!(path = %path, error = %e, "token file parse failed");
                Ok(Slots::default())
            },
        }
    }

    fn update(&self, key: TokenKey, value: Option<Secret<String>>) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut slots = self.read_slots()?;
        *slots.slot(key) = value;

        if slots.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&slots)?;
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Option<Secret<String>> {
        match self.read_slots() {
            Ok(mut slots) => slots.slot(key).take(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file read failed");
                None
            },
        }
    }

    fn set(&self, key: TokenKey, value: Secret<String>) -> Result<()> {
        debug!(path = %self.path.display(), key = %key, "storing credential");
        self.update(key, Some(value))
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        debug!(path = %self.path.display(), key = %key, "removing credential");
        self.update(key, None)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        info!(path = %self.path.display(), "clearing stored credentials");
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
