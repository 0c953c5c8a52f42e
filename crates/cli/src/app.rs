use std::{sync::Arc, time::Duration};

use {
    anyhow::{Result, bail},
    nowplay_config::{NowplayConfig, token_path, validate::validate_config},
    nowplay_oauth::{
        Bootstrap, CallbackServer, FileTokenStore, OAuthConfig, Redirected, Session,
        callback_server::DEFAULT_CALLBACK_TIMEOUT, redirect_url,
    },
    nowplay_player::PlayerClient,
    tracing::info,
};

use crate::browser::SystemBrowser;

/// Everything a command needs, built once from the loaded config.
pub struct App {
    pub config: NowplayConfig,
    pub session: Session,
    pub player: Arc<PlayerClient>,
    pub token_path: std::path::PathBuf,
    browser: Arc<SystemBrowser>,
}

impl App {
    pub fn new(config: NowplayConfig, no_browser: bool) -> Result<Self> {
        let token_path = token_path(&config);
        let store = Arc::new(FileTokenStore::new(&token_path));

        let mut builder = reqwest::Client::builder();
        if config.api.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.api.timeout_secs));
        }
        let client = builder.build()?;

        let oauth = OAuthConfig::from(&config.oauth);
        let browser = Arc::new(SystemBrowser::new(no_browser, redirect_url(&oauth)?));
        let session = Session::new(oauth, store, browser.clone(), client);
        let player = Arc::new(PlayerClient::new(session.gateway(), &config.api.base_url)?);

        Ok(Self {
            config,
            session,
            player,
            token_path,
            browser,
        })
    }

    /// Refuse to talk to the provider with a config it would reject.
    pub fn ensure_configured(&self) -> Result<()> {
        let result = validate_config(&self.config);
        if result.has_errors() {
            let problems: Vec<String> = result
                .diagnostics
                .iter()
                .filter(|d| d.severity == nowplay_config::Severity::Error)
                .map(|d| format!("  {}: {}", d.path, d.message))
                .collect();
            bail!(
                "configuration is incomplete (see `nowplay config check`):\n{}",
                problems.join("\n")
            );
        }
        Ok(())
    }

    /// Listener bound when the browser was sent to the provider, or a fresh
    /// one when this process joined an authorization it did not start.
    async fn callback_server(&self) -> Result<CallbackServer> {
        if let Some(server) = self.browser.take_callback() {
            return Ok(server);
        }
        let redirect = redirect_url(self.session.config())?;
        Ok(CallbackServer::bind(&redirect).await?)
    }

    /// Wait for the provider to redirect back and finish the code exchange.
    pub async fn complete(&self, redirected: &Redirected) -> Result<()> {
        let server = self.callback_server().await?;
        info!(authorize_url = %redirected.url().origin().ascii_serialization(), "awaiting callback");
        println!(
            "Waiting for authorization on {} ...",
            server.redirect_uri()
        );
        let callback = server
            .wait_for_callback(&self.session.config().callback_param, DEFAULT_CALLBACK_TIMEOUT)
            .await?;

        match self.session.bootstrap(Some(&callback)).await? {
            Bootstrap::Authorized { .. } => {
                println!("Authorized.");
                Ok(())
            },
            Bootstrap::Redirected(_) => bail!("callback did not carry an authorization code"),
        }
    }

    /// A request ended in re-authorization: finish it and tell the user the
    /// request itself was not sent.
    pub async fn recover(&self, redirected: Redirected) -> Result<()> {
        self.complete(&redirected).await?;
        println!("Session renewed. The previous request was discarded; run it again.");
        Ok(())
    }
}
