use std::sync::Arc;

use {
    reqwest::{Request, RequestBuilder, Response, StatusCode, header::HeaderValue},
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    error::Context,
    exchange::TokenExchanger,
    redirect::{Redirected, Redirector},
    storage::{TokenKey, TokenStore},
};

/// Outcome of an authenticated request.
#[derive(Debug)]
#[must_use]
pub enum Fetched {
    /// The provider's response, whatever its status.
    Response(Response),
    /// The user was sent to re-authorize; the request was abandoned.
    Redirected(Redirected),
}

impl Fetched {
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(resp) => Some(resp),
            Self::Redirected(_) => None,
        }
    }

    pub fn is_redirected(&self) -> bool {
        matches!(self, Self::Redirected(_))
    }
}

/// Attaches the stored bearer token to requests and recovers from expiry.
///
/// A 401 triggers one refresh and one retry. Refreshes are serialized so a
/// burst of 401s costs a single token request, and a burst that ends in
/// re-authorization navigates once and shares that redirect.
pub struct AuthGateway {
    client: reqwest::Client,
    store: Arc<dyn TokenStore>,
    exchanger: TokenExchanger,
    redirector: Redirector,
    recovery: Mutex<Recovery>,
}

/// Shared outcome of the last refresh or redirect, guarded by the gateway.
#[derive(Default)]
struct Recovery {
    /// Access token whose refresh already failed.
    failed_token: Option<Secret<String>>,
    /// Authorization in flight; reused while its verifier is still stored.
    redirect: Option<Redirected>,
}

enum Renewal {
    Token(Secret<String>),
    Reauthorize(Redirected),
}

impl AuthGateway {
    pub fn new(
        client: reqwest::Client,
        store: Arc<dyn TokenStore>,
        exchanger: TokenExchanger,
        redirector: Redirector,
    ) -> Self {
        Self {
            client,
            store,
            exchanger,
            redirector,
            recovery: Mutex::new(Recovery::default()),
        }
    }

    /// Client requests should be built from, so they share its pool and
    /// timeout.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Fetched> {
        let request = request.build()?;

        let Some(token) = self.store.get(TokenKey::AccessToken) else {
            info!("no access token stored, starting authorization");
            let mut recovery = self.recovery.lock().await;
            return Ok(Fetched::Redirected(self.redirect_once(&mut recovery)?));
        };

        let retry = request.try_clone().ok_or(Error::UnretryableRequest)?;
        let method = request.method().clone();
        let url = request.url().clone();

        let resp = self.execute(request, &token).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(Fetched::Response(resp));
        }

        info!(%method, path = url.path(), "access token rejected, refreshing");
        match self.renew_after(&token).await? {
            Renewal::Token(fresh) => {
                let resp = self.execute(retry, &fresh).await?;
                debug!(%method, path = url.path(), status = resp.status().as_u16(), "retried request");
                Ok(Fetched::Response(resp))
            },
            Renewal::Reauthorize(redirected) => Ok(Fetched::Redirected(redirected)),
        }
    }

    async fn execute(&self, mut request: Request, token: &Secret<String>) -> Result<Response> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .context("invalid access token header")?;
        value.set_sensitive(true);
        request
            .headers_mut()
            .insert(reqwest::header::AUTHORIZATION, value);
        Ok(self.client.execute(request).await?)
    }

    /// New access token after `rejected` got a 401, or the redirect the user
    /// has to follow.
    async fn renew_after(&self, rejected: &Secret<String>) -> Result<Renewal> {
        let mut recovery = self.recovery.lock().await;

        if let Some(current) = self.store.get(TokenKey::AccessToken)
            && current.expose_secret() != rejected.expose_secret()
        {
            debug!("access token already refreshed by a concurrent request");
            return Ok(Renewal::Token(current));
        }

        if recovery
            .failed_token
            .as_ref()
            .is_some_and(|failed| failed.expose_secret() == rejected.expose_secret())
        {
            debug!("refresh already failed for this token");
            return Ok(Renewal::Reauthorize(self.redirect_once(&mut recovery)?));
        }

        match self.exchanger.refresh().await {
            Ok(token) => {
                self.store.set(TokenKey::AccessToken, token.clone())?;
                recovery.failed_token = None;
                Ok(Renewal::Token(token))
            },
            Err(e) if e.requires_reauthorization() => {
                warn!(error = %e, "token refresh failed, reauthorization required");
                recovery.failed_token = Some(rejected.clone());
                Ok(Renewal::Reauthorize(self.redirect_once(&mut recovery)?))
            },
            Err(e) => Err(e),
        }
    }

    /// Join the authorization in flight, or start one. Only a redirect whose
    /// verifier is still stored can be joined.
    fn redirect_once(&self, recovery: &mut Recovery) -> Result<Redirected> {
        if let Some(pending) = &recovery.redirect
            && self.redirector.is_pending(pending)
        {
            debug!("joining authorization already in flight");
            return Ok(pending.clone());
        }
        let redirected = self.redirector.redirect()?;
        recovery.redirect = Some(redirected.clone());
        Ok(redirected)
    }
}
