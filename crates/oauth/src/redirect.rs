use std::sync::{Arc, Mutex, PoisonError};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info},
    url::Url,
};

use crate::{
    Result,
    error::Context,
    pkce::{generate_challenge, generate_pkce},
    storage::{TokenKey, TokenStore},
    types::OAuthConfig,
};

/// Sends the user agent to the provider's authorize URL.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> Result<()>;
}

/// Navigator for headless use: records the URL so the caller can show it.
#[derive(Default)]
pub struct ManualNavigator {
    visited: Mutex<Vec<Url>>,
}

impl ManualNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for ManualNavigator {
    fn navigate(&self, url: &Url) -> Result<()> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
        Ok(())
    }
}

/// Proof that the user agent was sent to the authorize endpoint.
///
/// Only [`Redirector::redirect`] builds one, so holding it means the current
/// operation is over and must not be treated as authorized. Clones are handed
/// to requests that join an authorization already in flight.
#[derive(Debug, Clone)]
#[must_use = "a redirect ends the current operation"]
pub struct Redirected {
    url: Url,
}

impl Redirected {
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn challenge(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(name, _)| name == "code_challenge")
            .map(|(_, value)| value.into_owned())
    }
}

/// Starts a PKCE authorization: fresh verifier, stored, then navigation.
#[derive(Clone)]
pub struct Redirector {
    config: Arc<OAuthConfig>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl Redirector {
    pub fn new(
        config: Arc<OAuthConfig>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            store,
            navigator,
        }
    }

    /// Authorize URL for the given S256 challenge.
    pub fn authorize_url(&self, challenge: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.auth_url)
            .with_context(|| format!("invalid auth_url {:?}", self.config.auth_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge);
        Ok(url)
    }

    /// Replace any previous verifier and navigate to the authorize endpoint.
    ///
    /// The verifier is persisted before navigation so the callback always
    /// finds it.
    pub fn redirect(&self) -> Result<Redirected> {
        let pkce = generate_pkce();
        let url = self.authorize_url(&pkce.challenge)?;
        self.store
            .set(TokenKey::Verifier, Secret::new(pkce.verifier))?;
        debug!("stored PKCE verifier");

        info!(
            host = url.host_str().unwrap_or_default(),
            "redirecting to authorization endpoint"
        );
        self.navigator.navigate(&url)?;
        Ok(Redirected { url })
    }

    /// Whether the stored verifier still belongs to `redirected`, i.e. its
    /// callback has not been consumed and no newer redirect replaced it.
    pub fn is_pending(&self, redirected: &Redirected) -> bool {
        let Some(verifier) = self.store.get(TokenKey::Verifier) else {
            return false;
        };
        let current = generate_challenge(verifier.expose_secret());
        redirected.challenge().as_deref() == Some(current.as_str())
    }
}
