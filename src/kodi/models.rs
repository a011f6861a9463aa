use serde::{Deserialize, Serialize};

/// Envelope of every Kodi JSON-RPC reply.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivePlayer {
    pub playerid: i64,
    #[serde(rename = "type")]
    pub player_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemResult {
    pub item: KodiItem,
}

/// `Player.GetItem` item with the properties this crate asks for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KodiItem {
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: Vec<String>,
    #[serde(default)]
    pub album: String,
    pub showtitle: Option<String>,
    pub duration: Option<u64>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub mediapath: String,
    pub season: Option<i64>,
    pub episode: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PrepareDownloadResult {
    pub details: DownloadDetails,
}

#[derive(Debug, Deserialize)]
pub struct DownloadDetails {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerProperties {
    pub position: Option<i64>,
    pub speed: Option<f64>,
    pub time: Option<GlobalTime>,
    pub totaltime: Option<GlobalTime>,
}

impl PlayerProperties {
    pub fn total_secs(&self) -> Option<u64> {
        self.totaltime
            .as_ref()
            .map(GlobalTime::as_secs)
            .filter(|secs| *secs > 0)
    }

    /// Seconds until the current item ends. `None` for live streams.
    pub fn time_left(&self) -> Option<u64> {
        let total = self.total_secs()?;
        let played = self.time.as_ref().map(GlobalTime::as_secs).unwrap_or(0);
        Some(total.saturating_sub(played))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobalTime {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl GlobalTime {
    pub fn as_secs(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

/// Strict view of "what is playing" handed to the monitor.
///
/// `get_now_playing` fills in what the item itself carries. The last three
/// fields, and a playable `thumbnail` URL, only arrive through
/// `RemotePlayer::enrich`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// `type:id:title`, with `-` standing in for a missing library id.
    pub raw_identifier: String,
    /// Kodi item type: `song`, `movie`, `episode`, `unknown`...
    pub media_type: String,
    pub duration_secs: Option<u64>,
    /// Kodi `image://` path until enriched, then an HTTP URL.
    pub thumbnail: Option<String>,
    /// `SxxEyy` for TV episodes.
    pub episode: Option<String>,
    pub mediapath: Option<String>,
    pub player_id: i64,
    pub playlist_position: Option<i64>,
    pub time_left_secs: Option<u64>,
}

fn clean(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl PlaybackMetadata {
    /// Normalise a raw item. Returns `None` when the item has no title,
    /// which Kodi uses for "nothing playing".
    pub fn from_item(item: &KodiItem, player_id: i64) -> Option<Self> {
        let mut title = item.title.trim().to_string();
        if title.is_empty() {
            return None;
        }

        let mut artist = clean(&item.artist.join(" "));

        // Radio add-ons report "Artist - Title" without an artist
        if artist.is_empty() {
            let parts: Vec<&str> = title.split(" - ").collect();
            if parts.len() == 2 {
                artist = parts[0].trim().to_string();
                title = parts[1].trim().to_string();
            }
        }

        let album = match item.showtitle.as_deref() {
            Some(show) if !show.trim().is_empty() => clean(show),
            _ => clean(&item.album),
        };

        let episode = match (item.season, item.episode) {
            (Some(season), Some(episode)) if season >= 0 && episode >= 0 => {
                Some(format!("S{:02}E{:02}", season, episode))
            }
            _ => None,
        };

        let media_type = if item.item_type.is_empty() {
            "unknown".to_string()
        } else {
            item.item_type.clone()
        };
        let id = item
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let raw_identifier = format!("{}:{}:{}", media_type, id, title);

        Some(Self {
            title,
            artist: non_empty(artist),
            album: non_empty(album),
            raw_identifier,
            media_type,
            duration_secs: item.duration.filter(|d| *d > 0),
            thumbnail: non_empty(item.thumbnail.trim().to_string()),
            episode,
            mediapath: non_empty(item.mediapath.trim().to_string()),
            player_id,
            playlist_position: None,
            time_left_secs: None,
        })
    }

    pub fn is_song(&self) -> bool {
        self.media_type == "song"
    }
}

/// Streams served by a Kodi add-on. These cannot be paused, only stopped.
pub fn is_plugin_path(path: &str) -> bool {
    path.starts_with("plugin://")
}
