//! Configuration validation.
//!
//! Reports syntax and type errors plus semantic problems (missing client id,
//! malformed endpoint URLs, a zero poll interval).

use std::path::{Path, PathBuf};

use url::Url;

use crate::{loader::find_config_file, schema::NowplayConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "oauth.client_id"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, path: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate the config file at `path`, or the discovered one, with
/// environment overrides applied.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

    let Some(actual_path) = config_path else {
        let mut config = NowplayConfig::default();
        crate::loader::apply_env_overrides(&mut config);
        let mut result = validate_config(&config);
        result.diagnostics.insert(
            0,
            Diagnostic::new(Severity::Info, "", "no config file found; using defaults"),
        );
        return result;
    };

    let mut result = match crate::loader::load_config(&actual_path) {
        Ok(mut config) => {
            crate::loader::apply_env_overrides(&mut config);
            validate_config(&config)
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "",
                format!("failed to load config: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Semantic checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &NowplayConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if config.oauth.client_id.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "oauth.client_id",
            "client id is empty; set it in nowplay.toml or NOWPLAY_CLIENT_ID",
        ));
    }

    for (path, value) in [
        ("oauth.auth_url", &config.oauth.auth_url),
        ("oauth.token_url", &config.oauth.token_url),
        ("oauth.redirect_uri", &config.oauth.redirect_uri),
        ("api.base_url", &config.api.base_url),
    ] {
        match Url::parse(value) {
            Ok(url) => {
                if url.scheme() == "http" && !is_loopback(&url) {
                    diagnostics.push(Diagnostic::new(
                        Severity::Warning,
                        path,
                        format!("{value} is plain http on a non-loopback host"),
                    ));
                }
            },
            Err(e) => diagnostics.push(Diagnostic::new(
                Severity::Error,
                path,
                format!("invalid URL {value:?}: {e}"),
            )),
        }
    }

    if let Ok(redirect) = Url::parse(&config.oauth.redirect_uri)
        && !is_loopback(&redirect)
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "oauth.redirect_uri",
            "redirect URI is not a loopback address; the local callback listener cannot receive it",
        ));
    }

    if config.oauth.scopes.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "oauth.scopes",
            "no scopes requested; playback endpoints will be refused",
        ));
    }

    if config.oauth.callback_param.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "oauth.callback_param",
            "callback parameter name is empty",
        ));
    }

    if config.poll.interval_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "poll.interval_ms",
            "poll interval must be greater than zero",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        Some(url::Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> NowplayConfig {
        let mut config = NowplayConfig::default();
        config.oauth.client_id = "abc123".into();
        config
    }

    #[test]
    fn defaults_with_client_id_are_clean() {
        let result = validate_config(&configured());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_client_id_is_error() {
        let result = validate_config(&NowplayConfig::default());
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "oauth.client_id")
        );
    }

    #[test]
    fn bad_urls_and_zero_interval() {
        let mut config = configured();
        config.oauth.token_url = "not a url".into();
        config.poll.interval_ms = 0;
        let result = validate_config(&config);
        assert_eq!(result.count(Severity::Error), 2);
    }

    #[test]
    fn remote_redirect_uri_warns() {
        let mut config = configured();
        config.oauth.redirect_uri = "https://example.com/callback".into();
        let result = validate_config(&config);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn unreadable_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowplay.toml");
        std::fs::write(&path, "[oauth\nclient_id = 1").unwrap();
        let result = validate(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
