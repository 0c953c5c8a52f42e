use std::sync::Arc;

use {
    nowplay_oauth::{AuthGateway, Fetched, Redirected},
    reqwest::{Method, StatusCode},
    serde::de::DeserializeOwned,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    Error, Result,
    error::Context,
    types::{UserPlayback, UserProfile},
};

/// Result of an API call that may have ended in re-authorization.
#[derive(Debug)]
#[must_use]
pub enum ApiOutcome<T> {
    Ready(T),
    Redirected(Redirected),
}

impl<T> ApiOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Redirected(_) => None,
        }
    }
}

/// Transport controls under `/me/player/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Pause,
    Play,
    Next,
    Previous,
}

impl PlayerCommand {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Play => "play",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::Pause | Self::Play => Method::PUT,
            Self::Next | Self::Previous => Method::POST,
        }
    }
}

impl std::str::FromStr for PlayerCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pause" => Ok(Self::Pause),
            "play" => Ok(Self::Play),
            "next" => Ok(Self::Next),
            "previous" => Ok(Self::Previous),
            other => Err(Error::message(format!("unknown player command {other:?}"))),
        }
    }
}

/// Spotify Web API client; every call goes through the [`AuthGateway`].
pub struct PlayerClient {
    gateway: Arc<AuthGateway>,
    base_url: Url,
}

impl PlayerClient {
    pub fn new(gateway: Arc<AuthGateway>, base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid api base_url {base_url:?}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { gateway, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn call(&self, method: Method, path: &str) -> Result<ApiOutcome<reqwest::Response>> {
        let url = self.endpoint(path)?;
        let request = self.gateway.client().request(method, url);
        Ok(match self.gateway.send(request).await? {
            Fetched::Response(resp) => ApiOutcome::Ready(resp),
            Fetched::Redirected(redirected) => ApiOutcome::Redirected(redirected),
        })
    }

    async fn json<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /me`.
    pub async fn profile(&self) -> Result<ApiOutcome<UserProfile>> {
        let resp = match self.call(Method::GET, "me").await? {
            ApiOutcome::Ready(resp) => resp,
            ApiOutcome::Redirected(r) => return Ok(ApiOutcome::Redirected(r)),
        };
        let profile: UserProfile = Self::json("me", resp).await?;
        debug!(user = %profile.id, "profile loaded");
        Ok(ApiOutcome::Ready(profile))
    }

    /// `GET /me/player`. Nothing playing (204) and error statuses are an
    /// empty state, not a failure.
    pub async fn playback(&self) -> Result<ApiOutcome<Option<UserPlayback>>> {
        let resp = match self.call(Method::GET, "me/player").await? {
            ApiOutcome::Ready(resp) => resp,
            ApiOutcome::Redirected(r) => return Ok(ApiOutcome::Redirected(r)),
        };
        let status = resp.status();
        if status == StatusCode::NO_CONTENT || status.as_u16() >= 400 {
            debug!(status = status.as_u16(), "no music playing or playback unavailable");
            return Ok(ApiOutcome::Ready(None));
        }
        let playback: UserPlayback = Self::json("me/player", resp).await?;
        Ok(ApiOutcome::Ready(Some(playback)))
    }

    /// Send a transport command. The status is returned as-is; Spotify
    /// answers 403 for accounts without playback control.
    pub async fn command(&self, command: PlayerCommand) -> Result<ApiOutcome<StatusCode>> {
        info!(command = command.endpoint(), "sending player command");
        let path = format!("me/player/{}", command.endpoint());
        Ok(match self.call(command.method(), &path).await? {
            ApiOutcome::Ready(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    warn!(command = command.endpoint(), status = status.as_u16(), "player command rejected");
                }
                ApiOutcome::Ready(status)
            },
            ApiOutcome::Redirected(r) => ApiOutcome::Redirected(r),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(PlayerCommand::Pause, "pause", Method::PUT)]
    #[case(PlayerCommand::Play, "play", Method::PUT)]
    #[case(PlayerCommand::Next, "next", Method::POST)]
    #[case(PlayerCommand::Previous, "previous", Method::POST)]
    fn command_routes(#[case] command: PlayerCommand, #[case] endpoint: &str, #[case] method: Method) {
        assert_eq!(command.endpoint(), endpoint);
        assert_eq!(command.method(), method);
        assert_eq!(endpoint.parse::<PlayerCommand>().unwrap(), command);
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!("shuffle".parse::<PlayerCommand>().is_err());
    }
}
