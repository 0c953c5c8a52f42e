use {
    nowplay_config::OAuthSection,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Provider endpoints and client registration for the PKCE flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Query parameter carrying the authorization code on the callback URL.
    #[serde(default = "default_callback_param")]
    pub callback_param: String,
}

fn default_callback_param() -> String {
    "code".into()
}

impl From<&OAuthSection> for OAuthConfig {
    fn from(section: &OAuthSection) -> Self {
        Self {
            client_id: section.client_id.clone(),
            auth_url: section.auth_url.clone(),
            token_url: section.token_url.clone(),
            redirect_uri: section.redirect_uri.clone(),
            scopes: section.scopes.clone(),
            callback_param: section.callback_param.clone(),
        }
    }
}

/// Body of a successful token endpoint response.
///
/// Every field is optional on the wire; the exchanger decides which ones a
/// given grant requires.
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<Secret<String>>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}
