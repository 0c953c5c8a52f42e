use {nowplay_config::OAuthSection, url::Url};

use crate::{Result, error::Context, types::OAuthConfig};

/// Built-in Spotify endpoints, scopes and loopback redirect for `client_id`.
pub fn spotify_config(client_id: impl Into<String>) -> OAuthConfig {
    OAuthConfig {
        client_id: client_id.into(),
        ..OAuthConfig::from(&OAuthSection::default())
    }
}

/// The configured redirect URI, parsed.
pub fn redirect_url(config: &OAuthConfig) -> Result<Url> {
    Url::parse(&config.redirect_uri)
        .with_context(|| format!("invalid redirect_uri {:?}", config.redirect_uri))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spotify_defaults() {
        let config = spotify_config("abc");
        assert_eq!(config.client_id, "abc");
        assert_eq!(config.auth_url, "https://accounts.spotify.com/authorize");
        assert_eq!(config.token_url, "https://accounts.spotify.com/api/token");
        assert_eq!(config.callback_param, "code");
        assert_eq!(config.scopes, [
            "user-read-private",
            "user-read-email",
            "user-read-playback-state",
            "user-modify-playback-state",
        ]);
    }

    #[test]
    fn redirect_url_exposes_loopback_port() {
        let url = redirect_url(&spotify_config("abc")).unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(8888));
        assert_eq!(url.path(), "/callback");
    }

    #[test]
    fn malformed_redirect_is_an_error() {
        let mut config = spotify_config("abc");
        config.redirect_uri = "::".into();
        let err = redirect_url(&config).unwrap_err();
        assert!(err.to_string().starts_with(r#"invalid redirect_uri "::": "#));
    }
}
