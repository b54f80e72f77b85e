//! Domain record types: playlists and their video members.
//!
//! `VideoSummary` doubles as the watch-later record type; its URL is both
//! the member reference and the dedup identity.

use serde::{Deserialize, Serialize};

/// Current time as Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lightweight serialized form of a resolved video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    /// Content URL; the member reference.
    pub url: String,
    /// Video title.
    pub title: String,
    /// Channel/uploader name.
    pub author: Option<String>,
    /// Video duration in seconds.
    pub duration_secs: Option<u64>,
    /// Thumbnail URL for the video.
    pub thumbnail_url: Option<String>,
}

impl VideoSummary {
    /// Create a summary from the two fields every video has.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            author: None,
            duration_secs: None,
            thumbnail_url: None,
        }
    }

    /// Set the uploader name.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the duration.
    #[must_use]
    pub const fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Set the thumbnail URL.
    #[must_use]
    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// A named, ordered collection of videos.
///
/// Member order is playback order and is preserved by every operation,
/// including reconstruction from backup text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    /// Stable identity. Generated for new playlists; carried through for
    /// reconstructed ones.
    pub id: String,
    /// Display name; also the label line of the backup text.
    pub name: String,
    /// Ordered members.
    pub items: Vec<VideoSummary>,
    /// When the content last changed (Unix millis).
    #[serde(default)]
    pub date_updated: u64,
    /// When the playlist was last played (Unix millis).
    #[serde(default)]
    pub date_last_played: u64,
}

impl PlaylistRecord {
    /// Create a playlist with a freshly generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, items: Vec<VideoSummary>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name, items)
    }

    /// Create a playlist under a known id (the reconstruction path).
    #[must_use]
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        items: Vec<VideoSummary>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items,
            date_updated: now_millis(),
            date_last_played: 0,
        }
    }

    /// Record a content change.
    pub fn touch_updated(&mut self) {
        self.date_updated = now_millis();
    }

    /// Record a playback.
    pub fn touch_played(&mut self) {
        self.date_last_played = now_millis();
    }

    /// Ordered member references (content URLs).
    #[must_use]
    pub fn member_references(&self) -> Vec<String> {
        self.items.iter().map(|v| v.url.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_playlist_generates_distinct_ids() {
        let a = PlaylistRecord::new("First", vec![]);
        let b = PlaylistRecord::new("Second", vec![]);
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_playlist_has_update_timestamp() {
        let playlist = PlaylistRecord::new("Stamped", vec![]);
        assert!(playlist.date_updated > 0);
        assert_eq!(playlist.date_last_played, 0);
    }

    #[test]
    fn test_touch_played_sets_timestamp() {
        let mut playlist = PlaylistRecord::new("Played", vec![]);
        playlist.touch_played();
        assert!(playlist.date_last_played > 0);
    }

    #[test]
    fn test_member_references_preserve_order() {
        let playlist = PlaylistRecord::new(
            "Ordered",
            vec![
                VideoSummary::new("https://example.com/v/1", "One"),
                VideoSummary::new("https://example.com/v/2", "Two"),
                VideoSummary::new("https://example.com/v/3", "Three"),
            ],
        );
        assert_eq!(
            playlist.member_references(),
            vec![
                "https://example.com/v/1",
                "https://example.com/v/2",
                "https://example.com/v/3"
            ]
        );
    }

    #[test]
    fn test_video_summary_builders() {
        let video = VideoSummary::new("https://example.com/v/9", "Nine")
            .with_author("Some Channel")
            .with_duration_secs(214)
            .with_thumbnail_url("https://example.com/t/9.jpg");
        assert_eq!(video.author.as_deref(), Some("Some Channel"));
        assert_eq!(video.duration_secs, Some(214));
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://example.com/t/9.jpg")
        );
    }

    #[test]
    fn test_playlist_serde_defaults_missing_timestamps() {
        let json = r#"{"id":"p1","name":"Legacy","items":[]}"#;
        let playlist: PlaylistRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(playlist.date_updated, 0);
        assert_eq!(playlist.date_last_played, 0);
    }
}
