//! Spotify Web API calls made through the authenticated gateway.

pub mod client;
pub mod error;
pub mod poller;
pub mod types;

pub use {
    client::{ApiOutcome, PlayerClient, PlayerCommand},
    error::{Error, Result},
    poller::{MIN_POLL_INTERVAL, PlaybackPoller, PollEvent},
    types::{Device, Image, PlaybackItem, UserPlayback, UserProfile},
};
