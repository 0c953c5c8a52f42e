use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use {
    axum::{
        Router,
        extract::RawQuery,
        http::StatusCode,
        response::{Html, IntoResponse, Response},
        routing::get,
    },
    tokio::{net::TcpListener, sync::oneshot},
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{Error, Result};

pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// How long a finished callback may take to flush its page to the browser.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Value of `param` in the callback URL's query, if present and non-empty.
pub fn callback_value(url: &Url, param: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == param && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// `url` without any occurrence of `param`; drops the `?` when nothing is
/// left.
pub fn strip_callback_param(url: &Url, param: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Loopback listener for the provider's redirect back to the client.
///
/// Bind before opening the browser so a fast redirect cannot arrive while
/// nothing is listening.
pub struct CallbackServer {
    listener: TcpListener,
    redirect_uri: Url,
}

impl CallbackServer {
    /// Bind the host and port of `redirect_uri`. Port 0 picks a free port and
    /// the returned [`CallbackServer::redirect_uri`] reflects it.
    pub async fn bind(redirect_uri: &Url) -> Result<Self> {
        let (host, port) = listen_addr(redirect_uri)?;
        let listener = TcpListener::bind((host, port)).await?;
        Self::from_listener(listener, redirect_uri, port)
    }

    /// Synchronous [`CallbackServer::bind`], for callers such as a
    /// [`Navigator`](crate::Navigator) that must listen before they return.
    /// Must be called from within a Tokio runtime.
    pub fn bind_now(redirect_uri: &Url) -> Result<Self> {
        let (host, port) = listen_addr(redirect_uri)?;
        let listener = std::net::TcpListener::bind((host, port))?;
        listener.set_nonblocking(true)?;
        Self::from_listener(TcpListener::from_std(listener)?, redirect_uri, port)
    }

    fn from_listener(listener: TcpListener, redirect_uri: &Url, port: u16) -> Result<Self> {
        let mut redirect_uri = redirect_uri.clone();
        let local = listener.local_addr()?;
        if port == 0 {
            redirect_uri
                .set_port(Some(local.port()))
                .map_err(|()| Error::message("redirect URI cannot carry a port"))?;
        }
        debug!(addr = %local, "callback listener bound");
        Ok(Self {
            listener,
            redirect_uri,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Serve until a callback carrying `param` or a provider `error` arrives,
    /// and return the full callback URL.
    ///
    /// Requests that carry neither get a 400 and the wait continues.
    pub async fn wait_for_callback(self, param: &str, timeout: Duration) -> Result<Url> {
        let (tx, rx) = oneshot::channel::<Result<Url>>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let base = self.redirect_uri.clone();
        let param = param.to_string();

        let app = Router::new().route(
            self.redirect_uri.path(),
            get(move |RawQuery(query): RawQuery| {
                let tx = Arc::clone(&tx);
                let base = base.clone();
                let param = param.clone();
                async move { handle_callback(&base, query.as_deref(), &param, &tx) }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .into_future(),
        );

        info!(redirect_uri = %self.redirect_uri, "waiting for authorization callback");
        let outcome = tokio::select! {
            result = rx => result.unwrap_or_else(|_| Err(Error::message("callback channel closed"))),
            () = tokio::time::sleep(timeout) => Err(Error::CallbackTimeout(timeout.as_secs())),
        };

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
            debug!("callback server did not shut down within grace period");
        }
        outcome
    }
}

fn listen_addr(redirect_uri: &Url) -> Result<(&str, u16)> {
    let host = redirect_uri
        .host_str()
        .ok_or_else(|| Error::message(format!("redirect URI {redirect_uri} has no host")))?;
    let port = redirect_uri.port_or_known_default().unwrap_or(80);
    Ok((host.trim_matches(['[', ']']), port))
}

type Reply = Arc<Mutex<Option<oneshot::Sender<Result<Url>>>>>;

fn handle_callback(base: &Url, query: Option<&str>, param: &str, tx: &Reply) -> Response {
    let mut url = base.clone();
    url.set_query(query);

    let result = if let Some(error) = callback_value(&url, "error") {
        warn!(error = %error, "provider returned an authorization error");
        Err(Error::AuthorizationDenied(error))
    } else if callback_value(&url, param).is_some() {
        Ok(url.clone())
    } else {
        debug!(param, "callback request without authorization parameter");
        return (
            StatusCode::BAD_REQUEST,
            Html(format!(
                "<h1>Missing {}</h1><p>Waiting for the authorization redirect.</p>",
                escape_html(param)
            )),
        )
            .into_response();
    };

    let Some(sender) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() else {
        return (
            StatusCode::GONE,
            Html("<h1>Already handled</h1><p>You can close this window.</p>".to_string()),
        )
            .into_response();
    };

    let page = match &result {
        Ok(_) => success_page(&strip_callback_param(&url, param)),
        Err(e) => format!(
            "<h1>Authentication failed</h1><p>{}</p>",
            escape_html(&e.to_string())
        ),
    };
    let _ = sender.send(result);
    Html(page).into_response()
}

/// Page that removes the code from the address bar and history.
fn success_page(cleaned: &Url) -> String {
    let target = serde_json::to_string(cleaned.as_str())
        .unwrap_or_else(|_| "\"/\"".into())
        .replace("</", "<\\/");
    format!(
        "<!doctype html><html><head><title>nowplay</title></head><body>\
         <h1>Authentication successful!</h1><p>You can close this window.</p>\
         <script>window.history.replaceState({{}}, document.title, {target});</script>\
         </body></html>"
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
