use crate::errors::AppResult;

use super::models::PlaybackMetadata;

/// Stateless requests sent to the remote player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    PlayPause { player_id: i64 },
    Stop { player_id: i64 },
    PreviousTrack { player_id: i64 },
    /// Reopen the music playlist at a saved position.
    Open { position: i64 },
    /// Replace the music playlist with a single file and start it.
    OpenFile { file: String },
    SystemShutdown,
    SystemReboot,
}

/// Request/response contract of the remote media player.
///
/// Every call carries a timeout. Any failure, whether transport or
/// protocol, is reported as `AppError::Unreachable`.
pub trait RemotePlayer: Send + Sync {
    /// Human readable `address:port`, used in connection messages.
    fn endpoint(&self) -> String;

    /// Current playback, or `None` when nothing is playing. Only asks for
    /// what is needed to tell one track from the next, and returns within
    /// one request timeout.
    fn get_now_playing(&self) -> AppResult<Option<PlaybackMetadata>>;

    /// Fill in the details of a track about to be notified: playlist
    /// position, a missing duration, time left and a downloadable
    /// thumbnail. Best effort; whatever cannot be resolved stays `None`.
    fn enrich(&self, metadata: &mut PlaybackMetadata);

    fn send_command(&self, command: PlayerCommand) -> AppResult<()>;

    /// Id of the first active player.
    fn active_player(&self) -> AppResult<Option<i64>>;

    /// Whether the player is running at a non-zero speed.
    fn is_playing(&self, player_id: i64) -> AppResult<bool>;

    /// Seconds until the current item ends, `None` when unknown.
    fn time_left(&self, player_id: i64) -> AppResult<Option<u64>>;
}
