use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::errors::{AppError, AppResult};

use super::models::*;
use super::traits::{PlayerCommand, RemotePlayer};

/// Music playlist id used by Kodi.
const MUSIC_PLAYLIST: i64 = 0;

const ITEM_PROPERTIES: &[&str] = &[
    "title",
    "album",
    "artist",
    "duration",
    "thumbnail",
    "showtitle",
    "mediapath",
    "season",
    "episode",
];

/// Blocking JSON-RPC client for Kodi's HTTP interface.
///
/// Requests that belong together (the two calls of a poll, the lookups of
/// `enrich`) share one deadline, so neither group outlasts the configured
/// request timeout.
pub struct KodiClient {
    client: Client,
    address: String,
    port: u16,
    timeout: Duration,
}

impl KodiClient {
    pub fn new(settings: &Settings) -> AppResult<Self> {
        let timeout = settings.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kodi-playing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            address: settings.address.clone(),
            port: settings.port,
            timeout,
        })
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    fn rpc_url(&self) -> String {
        format!("{}/jsonrpc", self.base_url())
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    fn post(&self, body: &Value, deadline: Instant) -> AppResult<String> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(AppError::Unreachable("Request deadline passed".to_string()));
        }

        let response = self
            .client
            .post(self.rpc_url())
            .timeout(remaining)
            .json(body)
            .send()?;

        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            log::debug!("[KodiClient] HTTP {} for {}", status, body);
            return Err(AppError::Unreachable(format!("HTTP {}", status.as_u16())));
        }

        Ok(text)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> AppResult<T> {
        self.call_before(method, params, self.deadline())
    }

    fn call_before<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        deadline: Instant,
    ) -> AppResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let text = self.post(&body, deadline)?;
        let resp: RpcResponse<T> = serde_json::from_str(&text)?;

        if let Some(err) = resp.error {
            return Err(AppError::Unreachable(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }

        resp.result
            .ok_or_else(|| AppError::Unreachable(format!("{} returned no result", method)))
    }

    fn get_properties(
        &self,
        player_id: i64,
        properties: &[&str],
        deadline: Instant,
    ) -> AppResult<PlayerProperties> {
        self.call_before(
            "Player.GetProperties",
            json!({ "playerid": player_id, "properties": properties }),
            deadline,
        )
    }

    /// Resolve a `image://` thumbnail into a downloadable URL.
    fn thumbnail_url(&self, thumbnail: &str, deadline: Instant) -> Option<String> {
        let params = json!({ "path": thumbnail });
        match self.call_before::<PrepareDownloadResult>("Files.PrepareDownload", params, deadline) {
            Ok(download) => Some(format!(
                "{}/{}",
                self.base_url(),
                download.details.path.trim_start_matches('/')
            )),
            Err(e) => {
                log::debug!("[KodiClient] No thumbnail for {}: {}", thumbnail, e);
                None
            }
        }
    }
}

impl RemotePlayer for KodiClient {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    fn get_now_playing(&self) -> AppResult<Option<PlaybackMetadata>> {
        let deadline = self.deadline();

        let players: Vec<ActivePlayer> =
            self.call_before("Player.GetActivePlayers", json!({}), deadline)?;
        // Only the first player is followed
        let Some(player_id) = players.first().map(|p| p.playerid) else {
            return Ok(None);
        };

        let result: ItemResult = self.call_before(
            "Player.GetItem",
            json!({ "properties": ITEM_PROPERTIES, "playerid": player_id }),
            deadline,
        )?;

        Ok(PlaybackMetadata::from_item(&result.item, player_id))
    }

    fn enrich(&self, metadata: &mut PlaybackMetadata) {
        let deadline = self.deadline();

        match self.get_properties(
            metadata.player_id,
            &["position", "time", "totaltime"],
            deadline,
        ) {
            Ok(props) => {
                metadata.playlist_position = props.position.filter(|p| *p >= 0);
                // Streams often lack a duration on the item itself
                if metadata.duration_secs.is_none() {
                    metadata.duration_secs = props.total_secs();
                }
                if !metadata.is_song() {
                    metadata.time_left_secs = props.time_left();
                }
            }
            Err(e) => log::debug!("[KodiClient] No player properties: {}", e),
        }

        metadata.thumbnail = metadata
            .thumbnail
            .take()
            .and_then(|thumb| self.thumbnail_url(&thumb, deadline));
    }

    fn send_command(&self, command: PlayerCommand) -> AppResult<()> {
        log::info!("[KodiClient] Sending {:?}", command);

        match command {
            PlayerCommand::PlayPause { player_id } => {
                self.call::<Value>("Player.PlayPause", json!({ "playerid": player_id }))?;
            }
            PlayerCommand::Stop { player_id } => {
                self.call::<Value>("Player.Stop", json!({ "playerid": player_id }))?;
            }
            PlayerCommand::PreviousTrack { player_id } => {
                self.call::<Value>(
                    "Player.GoTo",
                    json!({ "playerid": player_id, "to": "previous" }),
                )?;
            }
            PlayerCommand::Open { position } => {
                self.call::<Value>(
                    "Player.Open",
                    json!({ "item": { "playlistid": MUSIC_PLAYLIST, "position": position } }),
                )?;
            }
            PlayerCommand::OpenFile { file } => {
                // Player.Open with a plugin file is unreliable; go through the playlist
                let batch = json!([
                    {
                        "jsonrpc": "2.0",
                        "method": "Playlist.Clear",
                        "params": { "playlistid": MUSIC_PLAYLIST },
                        "id": 1
                    },
                    {
                        "jsonrpc": "2.0",
                        "method": "Playlist.Add",
                        "params": { "playlistid": MUSIC_PLAYLIST, "item": { "file": file } },
                        "id": 2
                    },
                    {
                        "jsonrpc": "2.0",
                        "method": "Player.Open",
                        "params": { "item": { "playlistid": MUSIC_PLAYLIST, "position": 0 } },
                        "id": 3
                    },
                ]);
                self.post(&batch, self.deadline())?;
            }
            PlayerCommand::SystemShutdown => {
                self.call::<Value>("System.Shutdown", json!({}))?;
            }
            PlayerCommand::SystemReboot => {
                self.call::<Value>("System.Reboot", json!({}))?;
            }
        }

        Ok(())
    }

    fn active_player(&self) -> AppResult<Option<i64>> {
        let players: Vec<ActivePlayer> = self.call("Player.GetActivePlayers", json!({}))?;
        Ok(players.first().map(|p| p.playerid))
    }

    fn is_playing(&self, player_id: i64) -> AppResult<bool> {
        let props = self.get_properties(player_id, &["speed"], self.deadline())?;
        Ok(props.speed.map(|s| s > 0.0).unwrap_or(false))
    }

    fn time_left(&self, player_id: i64) -> AppResult<Option<u64>> {
        let props = self.get_properties(player_id, &["time", "totaltime"], self.deadline())?;
        Ok(props.time_left())
    }
}
