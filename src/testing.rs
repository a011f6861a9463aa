//! In-memory fakes shared by the unit tests.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::errors::{AppError, AppResult};
use crate::kodi::{PlaybackMetadata, PlayerCommand, RemotePlayer};
use crate::notifications::{Notification, NotificationSink};

pub fn track(title: &str) -> PlaybackMetadata {
    PlaybackMetadata {
        title: title.to_string(),
        artist: Some(format!("{} artist", title)),
        album: None,
        raw_identifier: format!("song:-:{}", title),
        media_type: "song".to_string(),
        duration_secs: Some(200),
        thumbnail: None,
        episode: None,
        mediapath: None,
        player_id: 0,
        playlist_position: None,
        time_left_secs: None,
    }
}

/// Replays scripted "now playing" answers, one per call. Once the script
/// runs out the last answer repeats.
#[derive(Default)]
pub struct ScriptedPlayer {
    script: Mutex<VecDeque<AppResult<Option<PlaybackMetadata>>>>,
    last: Mutex<Option<Option<PlaybackMetadata>>>,
    pub commands: Mutex<Vec<PlayerCommand>>,
    pub active: Mutex<Option<i64>>,
    pub playing: Mutex<bool>,
    pub position: Mutex<Option<i64>>,
    pub time_left: Mutex<Option<u64>>,
    pub calls: Mutex<usize>,
    /// Titles passed to `enrich`, in order.
    pub enriched: Mutex<Vec<String>>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, answer: AppResult<Option<PlaybackMetadata>>) {
        self.script.lock().push_back(answer);
    }

    pub fn push_playing(&self, title: &str) {
        self.push(Ok(Some(track(title))));
    }

    pub fn push_nothing(&self) {
        self.push(Ok(None));
    }

    pub fn push_unreachable(&self) {
        self.push(Err(AppError::Unreachable("connection refused".to_string())));
    }

    pub fn sent(&self) -> Vec<PlayerCommand> {
        self.commands.lock().clone()
    }
}

impl RemotePlayer for ScriptedPlayer {
    fn endpoint(&self) -> String {
        "kodi.local:8080".to_string()
    }

    fn get_now_playing(&self) -> AppResult<Option<PlaybackMetadata>> {
        *self.calls.lock() += 1;
        match self.script.lock().pop_front() {
            Some(Ok(answer)) => {
                *self.last.lock() = Some(answer.clone());
                Ok(answer)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().clone().flatten()),
        }
    }

    fn enrich(&self, metadata: &mut PlaybackMetadata) {
        self.enriched.lock().push(metadata.title.clone());
        metadata.playlist_position = *self.position.lock();
        if !metadata.is_song() {
            metadata.time_left_secs = *self.time_left.lock();
        }
    }

    fn send_command(&self, command: PlayerCommand) -> AppResult<()> {
        self.commands.lock().push(command);
        Ok(())
    }

    fn active_player(&self) -> AppResult<Option<i64>> {
        Ok(*self.active.lock())
    }

    fn is_playing(&self, _player_id: i64) -> AppResult<bool> {
        Ok(*self.playing.lock())
    }

    fn time_left(&self, _player_id: i64) -> AppResult<Option<u64>> {
        Ok(*self.time_left.lock())
    }
}

/// Remote player that is never reachable.
pub struct OfflinePlayer;

impl RemotePlayer for OfflinePlayer {
    fn endpoint(&self) -> String {
        "offline:8080".to_string()
    }

    fn get_now_playing(&self) -> AppResult<Option<PlaybackMetadata>> {
        Err(AppError::Unreachable("timed out".to_string()))
    }

    fn enrich(&self, _metadata: &mut PlaybackMetadata) {}

    fn send_command(&self, _command: PlayerCommand) -> AppResult<()> {
        Err(AppError::Unreachable("timed out".to_string()))
    }

    fn active_player(&self) -> AppResult<Option<i64>> {
        Err(AppError::Unreachable("timed out".to_string()))
    }

    fn is_playing(&self, _player_id: i64) -> AppResult<bool> {
        Err(AppError::Unreachable("timed out".to_string()))
    }

    fn time_left(&self, _player_id: i64) -> AppResult<Option<u64>> {
        Err(AppError::Unreachable("timed out".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub shown: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn summaries(&self) -> Vec<String> {
        self.shown.lock().iter().map(|n| n.summary.clone()).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn show(&self, notification: &Notification) -> AppResult<()> {
        self.shown.lock().push(notification.clone());
        Ok(())
    }
}
