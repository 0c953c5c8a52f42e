use std::error::Error as StdError;

use nowplay_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Code exchange was attempted without a verifier from a prior redirect.
    #[error("no PKCE verifier stored; start the authorization flow first")]
    MissingVerifier,
    #[error("no refresh token found; user must reauthenticate")]
    NoRefreshToken,
    #[error("token endpoint returned {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },
    #[error("token response is missing {0}")]
    MissingField(&'static str),
    #[error("authorization was denied by the provider: {0}")]
    AuthorizationDenied(String),
    #[error("PKCE verifier length {0} is outside 43..=128")]
    InvalidVerifierLength(usize),
    /// The request body is a stream and cannot be replayed after a refresh.
    #[error("request cannot be cloned for a retry")]
    UnretryableRequest,
    #[error("timed out after {0}s waiting for the authorization callback")]
    CallbackTimeout(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error("{message}")]
    Message { message: String },
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether recovering from this error means sending the user back
    /// through the authorize endpoint.
    #[must_use]
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Self::MissingVerifier
                | Self::NoRefreshToken
                | Self::TokenExchangeFailed { .. }
                | Self::MissingField(_)
        )
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

nowplay_common::impl_context!();
