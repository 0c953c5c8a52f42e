use nowplay_player::{UserPlayback, UserProfile};

const BAR_WIDTH: usize = 30;
const PLACEHOLDER_ART: &str = "(no artwork)";

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

pub fn progress_bar(progress_ms: u64, duration_ms: u64, width: usize) -> String {
    let filled = if duration_ms == 0 {
        0
    } else {
        let ratio = progress_ms.min(duration_ms) as f64 / duration_ms as f64;
        (ratio * width as f64).round() as usize
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn now_playing(playback: &UserPlayback) -> String {
    let Some(item) = &playback.item else {
        return "Nothing playing.".to_string();
    };
    let state = if playback.is_playing { "▶" } else { "⏸" };
    let progress = playback.progress_ms.unwrap_or_default();
    let artists = item.artist_names();
    let title = if artists.is_empty() {
        item.name.clone()
    } else {
        format!("{} — {artists}", item.name)
    };
    format!(
        "{state} {title}  {} {} / {}",
        progress_bar(progress, item.duration_ms, BAR_WIDTH),
        format_duration(progress),
        format_duration(item.duration_ms)
    )
}

pub fn playback_details(playback: &UserPlayback) -> Vec<String> {
    let mut lines = vec![now_playing(playback)];
    if let Some(item) = &playback.item {
        if let Some(album) = &item.album {
            lines.push(format!("Album:   {}", album.name));
        }
        lines.push(format!(
            "Artwork: {}",
            item.artwork_url().unwrap_or(PLACEHOLDER_ART)
        ));
    }
    if let Some(device) = &playback.device {
        lines.push(format!("Device:  {} ({})", device.name, device.kind));
    }
    lines.push(format!(
        "Shuffle: {}  Repeat: {}",
        if playback.shuffle_state { "on" } else { "off" },
        playback.repeat_state
    ));
    lines
}

pub fn profile(profile: &UserProfile) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        profile.display_name.as_deref().unwrap_or("(no display name)"),
        profile.id
    )];
    if let Some(email) = &profile.email {
        lines.push(format!("Email:     {email}"));
    }
    if let Some(country) = &profile.country {
        lines.push(format!("Country:   {country}"));
    }
    if let Some(product) = &profile.product {
        lines.push(format!("Product:   {product}"));
    }
    lines.push(format!("Followers: {}", profile.followers.total));
    lines.push(format!("URI:       {}", profile.uri));
    if let Some(url) = &profile.external_urls.spotify {
        lines.push(format!("Link:      {url}"));
    }
    if let Some(image) = profile.images.first() {
        lines.push(format!("Avatar:    {}", image.url));
    }
    lines
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        nowplay_player::{PlaybackItem, types::Artist},
        rstest::rstest,
    };

    #[rstest]
    #[case(0, "0:00")]
    #[case(61_000, "1:01")]
    #[case(367_999, "6:07")]
    #[case(3_723_000, "1:02:03")]
    fn durations(#[case] ms: u64, #[case] expected: &str) {
        assert_eq!(format_duration(ms), expected);
    }

    #[test]
    fn bar_is_clamped_and_fixed_width() {
        assert_eq!(progress_bar(0, 100, 10), "[----------]");
        assert_eq!(progress_bar(50, 100, 10), "[#####-----]");
        assert_eq!(progress_bar(500, 100, 10), "[##########]");
        assert_eq!(progress_bar(10, 0, 4), "[----]");
    }

    #[test]
    fn now_playing_line_names_track_and_artists() {
        let playback = UserPlayback {
            is_playing: true,
            progress_ms: Some(30_000),
            item: Some(PlaybackItem {
                name: "Teardrop".into(),
                duration_ms: 60_000,
                artists: vec![Artist {
                    id: None,
                    name: "Massive Attack".into(),
                }],
                ..PlaybackItem::default()
            }),
            ..UserPlayback::default()
        };
        let line = now_playing(&playback);
        assert!(line.starts_with("▶ Teardrop — Massive Attack"));
        assert!(line.ends_with("0:30 / 1:00"));
    }

    #[test]
    fn empty_playback_reads_as_nothing_playing() {
        assert_eq!(now_playing(&UserPlayback::default()), "Nothing playing.");
    }

    #[test]
    fn details_fall_back_to_placeholder_art() {
        let playback = UserPlayback {
            item: Some(PlaybackItem::default()),
            ..UserPlayback::default()
        };
        let lines = playback_details(&playback);
        assert!(lines.iter().any(|l| l == "Artwork: (no artwork)"));
    }
}
