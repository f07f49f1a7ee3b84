use serde::{Deserialize, Serialize};

/// Where a queued song came from.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SongOrigin {
    /// Added by a client request.
    #[default]
    User,
    /// Added by the recommendation enricher.
    Recommended,
}

/// A song known to the queue.
///
/// Songs are immutable once built and compared by `id` for de-duplication.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Song {
    /// Opaque source-system key (for YouTube, the video id).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Thumbnail URL, if the source provided one.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Provenance of this entry.
    #[serde(default)]
    pub origin: SongOrigin,
}

impl Song {
    /// Build a user-added song.
    pub fn new(id: impl Into<String>, title: impl Into<String>, thumbnail: Option<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            thumbnail: thumbnail.filter(|url| !url.trim().is_empty()),
            origin: SongOrigin::User,
        }
    }

    /// Build a song added by the recommendation enricher.
    pub fn recommended(
        id: impl Into<String>,
        title: impl Into<String>,
        thumbnail: Option<String>,
    ) -> Self {
        Self {
            origin: SongOrigin::Recommended,
            ..Self::new(id, title, thumbnail)
        }
    }

    /// `true` when this entry was added by the enricher.
    pub fn is_recommended(&self) -> bool {
        self.origin == SongOrigin::Recommended
    }
}

/// Consistent view of queue + playback state for polling clients.
///
/// `change_version` increases on every queue or playback mutation; a client that
/// last saw version `V` only needs to refetch `/queue` when the value differs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlaybackSnapshot {
    /// `true` while the sink is (intended to be) producing audio.
    pub is_playing: bool,
    /// Song most recently dispatched to the sink.
    pub current_song: Option<Song>,
    /// Volume level, 0..=100.
    pub volume: u8,
    /// Number of pending entries (excludes the current song).
    pub queue_len: usize,
    /// Monotonic change counter.
    pub change_version: u64,
}

/// Result of a pause toggle, as reported to clients.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    Playing,
    Paused,
}

impl PauseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseState::Playing => "playing",
            PauseState::Paused => "paused",
        }
    }
}

/// A search hit returned by the media resolver.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    /// Thumbnail URL; empty when unknown.
    #[serde(default)]
    pub thumbnail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_thumbnail_is_dropped() {
        let song = Song::new("abc", "Title", Some("  ".to_string()));
        assert_eq!(song.thumbnail, None);
        assert_eq!(song.origin, SongOrigin::User);
    }

    #[test]
    fn recommended_song_keeps_fields() {
        let song = Song::recommended("abc", "Title", Some("http://img".to_string()));
        assert!(song.is_recommended());
        assert_eq!(song.thumbnail.as_deref(), Some("http://img"));
    }

    #[test]
    fn song_origin_defaults_when_missing() {
        let song: Song = serde_json::from_str(r#"{"id":"x","title":"t"}"#).unwrap();
        assert_eq!(song.origin, SongOrigin::User);
        assert_eq!(song.thumbnail, None);
    }
}
