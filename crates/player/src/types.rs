//! Response bodies of the endpoints the player uses.
//!
//! Fields default when absent so partial payloads (ads, podcasts, private
//! sessions) still decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplicitContent {
    pub filter_enabled: bool,
    pub filter_locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Followers {
    pub href: Option<String>,
    pub total: u64,
}

/// `GET /me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    pub uri: String,
    pub href: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub images: Vec<Image>,
    pub external_urls: ExternalUrls,
    pub followers: Followers,
    pub explicit_content: ExplicitContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackContext {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    pub id: Option<String>,
    pub name: String,
    pub images: Vec<Image>,
}

/// A track, or an episode when `currently_playing_type` is `episode`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItem {
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    /// Episode artwork; tracks carry theirs on the album.
    pub images: Vec<Image>,
}

impl PlaybackItem {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Medium-sized artwork: the second image when there is one, else the
    /// first.
    pub fn artwork_url(&self) -> Option<&str> {
        let images = match &self.album {
            Some(album) if !album.images.is_empty() => &album.images,
            _ => &self.images,
        };
        images.get(1).or_else(|| images.first()).map(|i| i.url.as_str())
    }
}

/// `GET /me/player`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPlayback {
    pub device: Option<Device>,
    pub repeat_state: String,
    pub shuffle_state: bool,
    pub context: Option<PlaybackContext>,
    pub timestamp: u64,
    pub progress_ms: Option<u64>,
    pub is_playing: bool,
    pub item: Option<PlaybackItem>,
    pub currently_playing_type: String,
    pub actions: Option<serde_json::Value>,
}
