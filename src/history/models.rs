use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::kodi::PlaybackMetadata;

/// One distinct playback observed during the session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub timestamp: DateTime<Local>,
    pub raw_identifier: String,
    pub media_type: String,
    pub duration_secs: Option<u64>,
    pub thumbnail: Option<String>,
    pub episode: Option<String>,
}

impl PlaybackEvent {
    pub fn new(metadata: &PlaybackMetadata, timestamp: DateTime<Local>) -> Self {
        Self {
            title: metadata.title.clone(),
            artist: metadata.artist.clone(),
            album: metadata.album.clone(),
            timestamp,
            raw_identifier: metadata.raw_identifier.clone(),
            media_type: metadata.media_type.clone(),
            duration_secs: metadata.duration_secs,
            thumbnail: metadata.thumbnail.clone(),
            episode: metadata.episode.clone(),
        }
    }

    pub fn is_song(&self) -> bool {
        self.media_type == "song"
    }

    /// Title equal to the artist is a station announcement, not a song.
    pub fn is_announcement(&self) -> bool {
        self.artist.as_deref() == Some(self.title.as_str())
    }
}
