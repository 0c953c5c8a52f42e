use std::sync::Arc;

use {
    tracing::{debug, info},
    url::Url,
};

use crate::{
    Error, Result,
    callback_server::{callback_value, strip_callback_param},
    exchange::TokenExchanger,
    gateway::AuthGateway,
    redirect::{Navigator, Redirected, Redirector},
    storage::{TokenKey, TokenStore},
    types::OAuthConfig,
};

/// What [`Session::bootstrap`] settled on.
#[derive(Debug)]
#[must_use]
pub enum Bootstrap {
    /// An access token is stored. `cleaned_url` is the callback URL with the
    /// code removed when one was just exchanged.
    Authorized { cleaned_url: Option<Url> },
    Redirected(Redirected),
}

/// Wires the store, exchanger, redirector and gateway around one config.
pub struct Session {
    config: Arc<OAuthConfig>,
    store: Arc<dyn TokenStore>,
    exchanger: TokenExchanger,
    redirector: Redirector,
    gateway: Arc<AuthGateway>,
}

impl Session {
    pub fn new(
        config: OAuthConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        client: reqwest::Client,
    ) -> Self {
        let config = Arc::new(config);
        let exchanger = TokenExchanger::new(Arc::clone(&config), Arc::clone(&store), client.clone());
        let redirector = Redirector::new(Arc::clone(&config), Arc::clone(&store), navigator);
        let gateway = Arc::new(AuthGateway::new(
            client,
            Arc::clone(&store),
            exchanger.clone(),
            redirector.clone(),
        ));
        Self {
            config,
            store,
            exchanger,
            redirector,
            gateway,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn gateway(&self) -> Arc<AuthGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(TokenKey::AccessToken).is_some()
    }

    /// Settle the session from the URL the user agent is currently at.
    ///
    /// A code on `current_url` is exchanged first; otherwise a stored access
    /// token is enough; otherwise the user is sent to authorize.
    pub async fn bootstrap(&self, current_url: Option<&Url>) -> Result<Bootstrap> {
        if let Some(url) = current_url {
            if let Some(error) = callback_value(url, "error") {
                return Err(Error::AuthorizationDenied(error));
            }
            if let Some(code) = callback_value(url, &self.config.callback_param) {
                self.complete_authorization(&code).await?;
                return Ok(Bootstrap::Authorized {
                    cleaned_url: Some(strip_callback_param(url, &self.config.callback_param)),
                });
            }
        }

        if self.is_authenticated() {
            debug!("using stored access token");
            return Ok(Bootstrap::Authorized { cleaned_url: None });
        }
        Ok(Bootstrap::Redirected(self.redirector.redirect()?))
    }

    /// Exchange `code` and persist the access token.
    pub async fn complete_authorization(&self, code: &str) -> Result<()> {
        let access_token = self.exchanger.exchange_code(code).await?;
        self.store.set(TokenKey::AccessToken, access_token)?;
        info!("authorization complete");
        Ok(())
    }

    /// Start a fresh authorization regardless of stored tokens.
    pub fn reauthorize(&self) -> Result<Redirected> {
        self.redirector.redirect()
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("stored credentials cleared");
        Ok(())
    }
}
