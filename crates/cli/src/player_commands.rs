use std::{io::Write, sync::Arc, time::Duration};

use {
    anyhow::{Result, bail},
    nowplay_player::{ApiOutcome, PlaybackPoller, PlayerCommand, PollEvent},
    tracing::debug,
};

use crate::{app::App, render};

pub async fn profile(app: &App) -> Result<()> {
    app.ensure_configured()?;
    match app.player.profile().await? {
        ApiOutcome::Ready(profile) => {
            for line in render::profile(&profile) {
                println!("{line}");
            }
            Ok(())
        },
        ApiOutcome::Redirected(redirected) => app.recover(redirected).await,
    }
}

pub async fn now(app: &App) -> Result<()> {
    app.ensure_configured()?;
    match app.player.playback().await? {
        ApiOutcome::Ready(Some(playback)) => {
            for line in render::playback_details(&playback) {
                println!("{line}");
            }
            Ok(())
        },
        ApiOutcome::Ready(None) => {
            println!("No music playing.");
            Ok(())
        },
        ApiOutcome::Redirected(redirected) => app.recover(redirected).await,
    }
}

pub async fn command(app: &App, command: PlayerCommand) -> Result<()> {
    app.ensure_configured()?;
    match app.player.command(command).await? {
        ApiOutcome::Ready(status) if status.is_success() => {
            println!("{}: ok", command.endpoint());
            Ok(())
        },
        ApiOutcome::Ready(status) => bail!(
            "{} was rejected with {status} (playback control needs Spotify Premium and an active device)",
            command.endpoint()
        ),
        ApiOutcome::Redirected(redirected) => app.recover(redirected).await,
    }
}

/// Follow playback until Ctrl-C, re-authorizing in place when needed.
pub async fn watch(app: &App) -> Result<()> {
    app.ensure_configured()?;
    let interval = Duration::from_millis(app.config.poll.interval_ms);

    loop {
        let (poller, mut events) = PlaybackPoller::spawn(Arc::clone(&app.player), interval);
        let redirected = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(PollEvent::Playing(playback)) => redraw(&render::now_playing(&playback))?,
                    Some(PollEvent::NotPlaying) => redraw("No music playing.")?,
                    Some(PollEvent::Failed(e)) => redraw(&format!("(poll failed: {e})"))?,
                    Some(PollEvent::Redirected(redirected)) => break Some(redirected),
                    None => break None,
                },
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    return Ok(());
                },
            }
        };
        poller.stop();

        let Some(redirected) = redirected else {
            debug!("poller channel closed");
            return Ok(());
        };

        println!();
        app.complete(&redirected).await?;
    }
}

fn redraw(line: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\r\x1b[2K{line}")?;
    stdout.flush()?;
    Ok(())
}
