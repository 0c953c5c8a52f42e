use std::sync::{Mutex, PoisonError};

use {
    nowplay_oauth::{CallbackServer, Navigator, Result},
    tracing::{debug, warn},
    url::Url,
};

/// Opens the authorize URL in the desktop browser, or prints it.
///
/// The callback listener is bound before the URL leaves the process, so a
/// provider that redirects back instantly still finds someone listening.
pub struct SystemBrowser {
    print_only: bool,
    redirect_uri: Url,
    callback: Mutex<Option<CallbackServer>>,
}

impl SystemBrowser {
    pub fn new(print_only: bool, redirect_uri: Url) -> Self {
        Self {
            print_only,
            redirect_uri,
            callback: Mutex::new(None),
        }
    }

    /// Listener bound by the last navigation, if nobody took it yet.
    pub fn take_callback(&self) -> Option<CallbackServer> {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn listen(&self) -> Result<()> {
        let mut slot = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(CallbackServer::bind_now(&self.redirect_uri)?);
        } else {
            debug!("callback listener already bound");
        }
        Ok(())
    }
}

impl Navigator for SystemBrowser {
    fn navigate(&self, url: &Url) -> Result<()> {
        self.listen()?;

        if self.print_only {
            println!("Open this URL to authorize nowplay:\n{url}");
            return Ok(());
        }
        println!("Opening browser for authorization...");
        if let Err(e) = open::that(url.as_str()) {
            warn!(error = %e, "could not launch browser");
            println!("Could not open browser. Please visit:\n{url}");
        }
        Ok(())
    }
}
