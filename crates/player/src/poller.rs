use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    nowplay_oauth::Redirected,
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, warn},
};

use crate::{
    client::{ApiOutcome, PlayerClient},
    types::UserPlayback,
};

const EVENT_BUFFER: usize = 16;

/// Shortest accepted interval; shorter ones, zero included, are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum PollEvent {
    Playing(Box<UserPlayback>),
    NotPlaying,
    /// The user was sent to re-authorize; polling has stopped.
    Redirected(Redirected),
    Failed(String),
}

/// Fetches playback state on a fixed interval.
///
/// Each tick spawns its own fetch, so a slow response never delays the next
/// tick. Polling stops when the handle is dropped, the receiver is dropped, or
/// a fetch ends in re-authorization.
pub struct PlaybackPoller {
    handle: JoinHandle<()>,
}

impl PlaybackPoller {
    pub fn spawn(client: Arc<PlayerClient>, interval: Duration) -> (Self, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let halted = Arc::new(AtomicBool::new(false));
        if interval < MIN_POLL_INTERVAL {
            debug!(requested_ms = interval.as_millis(), "poll interval raised to the minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.is_closed() || halted.load(Ordering::Acquire) {
                    debug!("playback poller stopping");
                    break;
                }

                let client = Arc::clone(&client);
                let tx = tx.clone();
                let halted = Arc::clone(&halted);
                tokio::spawn(async move {
                    if halted.load(Ordering::Acquire) {
                        return;
                    }
                    let event = match client.playback().await {
                        Ok(ApiOutcome::Ready(Some(playback))) => PollEvent::Playing(Box::new(playback)),
                        Ok(ApiOutcome::Ready(None)) => PollEvent::NotPlaying,
                        Ok(ApiOutcome::Redirected(redirected)) => {
                            halted.store(true, Ordering::Release);
                            PollEvent::Redirected(redirected)
                        },
                        Err(e) => {
                            warn!(error = %e, "playback poll failed");
                            PollEvent::Failed(e.to_string())
                        },
                    };
                    let _ = tx.send(event).await;
                });
            }
        });

        (Self { handle }, rx)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PlaybackPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
