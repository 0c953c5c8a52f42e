use std::sync::Arc;

use {
    nowplay_common::fingerprint,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    storage::{TokenKey, TokenStore},
    types::{OAuthConfig, TokenResponse},
};

/// Talks to the token endpoint for both grants of the PKCE lifecycle.
#[derive(Clone)]
pub struct TokenExchanger {
    config: Arc<OAuthConfig>,
    store: Arc<dyn TokenStore>,
    client: reqwest::Client,
}

impl TokenExchanger {
    pub fn new(config: Arc<OAuthConfig>, store: Arc<dyn TokenStore>, client: reqwest::Client) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    /// Trade an authorization code for tokens using the stored verifier.
    ///
    /// Stores the refresh token and drops the consumed verifier. The caller
    /// persists the returned access token.
    pub async fn exchange_code(&self, code: &str) -> Result<Secret<String>> {
        let verifier = self
            .store
            .get(TokenKey::Verifier)
            .ok_or(Error::MissingVerifier)?;

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.expose_secret().as_str()),
        ];
        let resp = self.post_token_form(&form).await?;

        let access_token = resp.access_token.ok_or(Error::MissingField("access_token"))?;
        let refresh_token = resp
            .refresh_token
            .ok_or(Error::MissingField("refresh_token"))?;

        info!(
            refresh = %fingerprint(&refresh_token),
            expires_in = resp.expires_in,
            "authorization code exchanged"
        );
        self.store.set(TokenKey::RefreshToken, refresh_token)?;
        self.store.remove(TokenKey::Verifier)?;
        Ok(access_token)
    }

    /// Obtain a new access token with the stored refresh token.
    ///
    /// A rotated refresh token replaces the stored one; otherwise the old one
    /// stays.
    pub async fn refresh(&self) -> Result<Secret<String>> {
        let Some(refresh_token) = self.store.get(TokenKey::RefreshToken) else {
            warn!("no refresh token found, user must reauthenticate");
            return Err(Error::NoRefreshToken);
        };

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret().as_str()),
        ];
        let resp = self.post_token_form(&form).await?;

        let access_token = resp.access_token.ok_or(Error::MissingField("access_token"))?;
        match resp.refresh_token {
            Some(rotated) => {
                info!(
                    old = %fingerprint(&refresh_token),
                    new = %fingerprint(&rotated),
                    "refresh token rotated"
                );
                self.store.set(TokenKey::RefreshToken, rotated)?;
            },
            None => debug!("refresh token kept"),
        }
        info!(expires_in = resp.expires_in, "access token refreshed");
        Ok(access_token)
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let grant_type = form
            .iter()
            .find_map(|(k, v)| (*k == "grant_type").then_some(*v))
            .unwrap_or_default();
        debug!(token_url = %self.config.token_url, grant_type, "token request");

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), grant_type, "token endpoint rejected request");
            return Err(Error::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::storage::MemoryTokenStore,
        mockito::{Matcher, Server},
    };

    fn exchanger(server: &mockito::ServerGuard) -> (TokenExchanger, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let config = Arc::new(OAuthConfig {
            client_id: "client-123".into(),
            auth_url: format!("{}/authorize", server.url()),
            token_url: format!("{}/api/token", server.url()),
            redirect_uri: "http://127.0.0.1:8888/callback".into(),
            scopes: vec![],
            callback_param: "code".into(),
        });
        let exchanger = TokenExchanger::new(config, store.clone(), reqwest::Client::new());
        (exchanger, store)
    }

    fn secret(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    #[tokio::test]
    async fn exchange_without_verifier_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/api/token").expect(0).create_async().await;
        let (exchanger, _store) = exchanger(&server);

        let err = exchanger.exchange_code("abc123").await.unwrap_err();
        assert!(matches!(err, Error::MissingVerifier));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_posts_verifier_and_stores_refresh_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "abc123".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://127.0.0.1:8888/callback".into(),
                ),
                Matcher::UrlEncoded("code_verifier".into(), "v-stored".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let (exchanger, store) = exchanger(&server);
        store.set(TokenKey::Verifier, secret("v-stored")).unwrap();

        let access = exchanger.exchange_code("abc123").await.unwrap();
        assert_eq!(access.expose_secret(), "at-1");
        assert_eq!(store.get(TokenKey::RefreshToken).unwrap().expose_secret(), "rt-1");
        assert!(store.get(TokenKey::Verifier).is_none());
        assert!(store.get(TokenKey::AccessToken).is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_rejection_reports_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let (exchanger, store) = exchanger(&server);
        store.set(TokenKey::Verifier, secret("v")).unwrap();

        let err = exchanger.exchange_code("abc123").await.unwrap_err();
        match err {
            Error::TokenExchangeFailed { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.get(TokenKey::RefreshToken).is_none());
    }

    #[tokio::test]
    async fn exchange_requires_refresh_token_in_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-1"}"#)
            .create_async()
            .await;

        let (exchanger, store) = exchanger(&server);
        store.set(TokenKey::Verifier, secret("v")).unwrap();

        let err = exchanger.exchange_code("abc123").await.unwrap_err();
        assert!(matches!(err, Error::MissingField("refresh_token")));
    }

    #[tokio::test]
    async fn refresh_without_token_is_terminal() {
        let server = Server::new_async().await;
        let (exchanger, _store) = exchanger(&server);
        let err = exchanger.refresh().await.unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
        assert!(err.requires_reauthorization());
    }

    #[tokio::test]
    async fn refresh_without_rotation_keeps_refresh_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt-old".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-2","token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let (exchanger, store) = exchanger(&server);
        store.set(TokenKey::RefreshToken, secret("rt-old")).unwrap();

        let access = exchanger.refresh().await.unwrap();
        assert_eq!(access.expose_secret(), "at-2");
        assert_eq!(store.get(TokenKey::RefreshToken).unwrap().expose_secret(), "rt-old");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_with_rotation_replaces_refresh_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at-2","refresh_token":"rt-new"}"#)
            .create_async()
            .await;

        let (exchanger, store) = exchanger(&server);
        store.set(TokenKey::RefreshToken, secret("rt-old")).unwrap();

        exchanger.refresh().await.unwrap();
        assert_eq!(store.get(TokenKey::RefreshToken).unwrap().expose_secret(), "rt-new");
    }
}
