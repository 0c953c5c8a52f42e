use {
    anyhow::Result,
    nowplay_common::fingerprint,
    nowplay_oauth::{Bootstrap, TokenKey},
};

use crate::app::App;

pub async fn login(app: &App, force: bool) -> Result<()> {
    app.ensure_configured()?;

    let redirected = if force {
        app.session.reauthorize()?
    } else {
        match app.session.bootstrap(None).await? {
            Bootstrap::Authorized { .. } => {
                println!("Already authorized. Use `nowplay login --force` to switch accounts.");
                return Ok(());
            },
            Bootstrap::Redirected(redirected) => redirected,
        }
    };

    app.complete(&redirected).await?;
    println!("Credentials saved to {}", app.token_path.display());
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    app.session.logout()?;
    println!("Logged out; stored credentials removed.");
    Ok(())
}

pub fn status(app: &App) -> Result<()> {
    let client_id = &app.config.oauth.client_id;
    if client_id.is_empty() {
        println!("Client id:     (not configured)");
    } else {
        println!("Client id:     {client_id}");
    }
    println!("Redirect URI:  {}", app.config.oauth.redirect_uri);
    println!("Token file:    {}", app.token_path.display());

    let store = app.session.store();
    for key in TokenKey::ALL {
        let state = store
            .get(key)
            .map_or_else(|| "absent".to_string(), |s| format!("present ({})", fingerprint(&s)));
        println!("{:<15}{state}", format!("{key}:"));
    }

    if !app.session.is_authenticated() {
        println!("\nNot authorized. Run `nowplay login`.");
    }
    Ok(())
}
