//! Error-context plumbing and secret helpers shared by every nowplay crate.

pub mod error;
pub mod secret;

pub use {
    error::FromMessage,
    secret::{fingerprint, serialize_option_secret},
};
