use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::AppResult;
use crate::history::PlaybackEvent;
use crate::kodi::{is_plugin_path, PlayerCommand, RemotePlayer};
use crate::monitor::{ConnectionStatus, MonitorHandle, PlaybackMonitor};
use crate::notifications::{Notification, NotificationSink};

/// A line typed on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    ShowCurrent,
    ShowIndex(usize),
    PlayPause,
    Previous,
    Stop,
    ShowLog,
    Status,
    Shutdown,
    Reboot,
    Quit,
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();

        let command = match name.as_str() {
            "now" | "current" => ControlCommand::ShowCurrent,
            "index" => {
                let index = arg
                    .and_then(|a| a.parse::<usize>().ok())
                    .ok_or_else(|| "usage: index <n>".to_string())?;
                ControlCommand::ShowIndex(index)
            }
            "pause" | "play" => ControlCommand::PlayPause,
            "prev" | "previous" => ControlCommand::Previous,
            "stop" => ControlCommand::Stop,
            "log" => ControlCommand::ShowLog,
            "status" => ControlCommand::Status,
            "shutdown" => ControlCommand::Shutdown,
            "reboot" => ControlCommand::Reboot,
            "quit" | "exit" => ControlCommand::Quit,
            other => return Err(format!("unknown command: {}", other)),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub endpoint: String,
    pub connection: ConnectionStatus,
    pub events: usize,
    pub now_playing: Option<String>,
}

/// Command surface for the UI side. Calls never wait on an in-flight poll.
pub struct Controller {
    monitor: Arc<PlaybackMonitor>,
    remote: Arc<dyn RemotePlayer>,
    sink: Arc<dyn NotificationSink>,
    notification_duration: Duration,
    log_path: Option<PathBuf>,
    handle: Mutex<Option<MonitorHandle>>,
}

impl Controller {
    pub fn new(
        monitor: Arc<PlaybackMonitor>,
        remote: Arc<dyn RemotePlayer>,
        sink: Arc<dyn NotificationSink>,
        notification_duration: Duration,
        log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            monitor,
            remote,
            sink,
            notification_duration,
            log_path,
            handle: Mutex::new(None),
        }
    }

    /// Start the poll loop. Does nothing if it already runs.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_none() {
            *handle = Some(self.monitor.clone().spawn());
        }
    }

    pub fn show_current(&self) -> AppResult<PlaybackEvent> {
        self.show_by_index(1)
    }

    /// Show the n-th most recent song again (1 = newest).
    pub fn show_by_index(&self, index: usize) -> AppResult<PlaybackEvent> {
        let event = self.monitor.history().lookup_by_index(index)?;
        let time_left = if index == 1 && !event.is_song() {
            self.current_time_left()
        } else {
            None
        };

        let notification = Notification::for_event(&event, time_left, self.notification_duration);
        if let Err(e) = self.sink.show(&notification) {
            log::warn!("[Controller] Notification failed: {}", e);
        }
        Ok(event)
    }

    fn current_time_left(&self) -> Option<u64> {
        let lookup = self
            .remote
            .active_player()
            .and_then(|player| match player {
                Some(player_id) => self.remote.time_left(player_id),
                None => Ok(None),
            });
        lookup.unwrap_or_else(|e| {
            log::debug!("[Controller] No time left: {}", e);
            None
        })
    }

    pub fn toggle_play_pause(&self) -> AppResult<()> {
        let player = self.remote.active_player()?;
        let resume = self.monitor.resume_point();

        if let Some(mediapath) = resume.mediapath.filter(|p| is_plugin_path(p)) {
            if let Some(player_id) = player {
                if self.remote.is_playing(player_id)? {
                    return self.remote.send_command(PlayerCommand::Stop { player_id });
                }
            }
            return self
                .remote
                .send_command(PlayerCommand::OpenFile { file: mediapath });
        }

        match player {
            Some(player_id) => self.remote.send_command(PlayerCommand::PlayPause { player_id }),
            None => match resume.playlist_position {
                Some(position) => {
                    self.remote.send_command(PlayerCommand::Open { position })?;
                    self.monitor.clear_resume_position();
                    Ok(())
                }
                None => {
                    log::debug!("[Controller] Nothing to play or pause");
                    Ok(())
                }
            },
        }
    }

    pub fn previous_track(&self) -> AppResult<()> {
        match self.remote.active_player()? {
            Some(player_id) => self.remote.send_command(PlayerCommand::PreviousTrack { player_id }),
            None => Ok(()),
        }
    }

    pub fn stop(&self) -> AppResult<()> {
        match self.remote.active_player()? {
            Some(player_id) => self.remote.send_command(PlayerCommand::Stop { player_id }),
            None => Ok(()),
        }
    }

    pub fn shutdown_system(&self) -> AppResult<()> {
        self.remote.send_command(PlayerCommand::SystemShutdown)
    }

    pub fn reboot_system(&self) -> AppResult<()> {
        self.remote.send_command(PlayerCommand::SystemReboot)
    }

    pub fn status(&self) -> StatusInfo {
        let state = self.monitor.state();
        StatusInfo {
            endpoint: self.remote.endpoint(),
            connection: state.connection_status,
            events: self.monitor.history().len(),
            now_playing: state.last_known_event.map(|e| e.title),
        }
    }

    pub fn export(&self) -> Vec<u8> {
        self.monitor.history().export()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Stop polling after the current tick.
    pub fn quit(&self) {
        if let Some(mut handle) = self.handle.lock().take() {
            log::info!("[Controller] Quitting");
            handle.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkipPolicy;
    use crate::errors::AppError;
    use crate::monitor::MonitorOptions;
    use crate::skip_filter::SkipFilter;
    use crate::testing::{track, RecordingSink, ScriptedPlayer};

    fn setup() -> (Arc<ScriptedPlayer>, Arc<RecordingSink>, Arc<PlaybackMonitor>, Controller) {
        let player = Arc::new(ScriptedPlayer::new());
        let sink = Arc::new(RecordingSink::default());
        let monitor = Arc::new(
            PlaybackMonitor::new(
                player.clone(),
                sink.clone(),
                SkipFilter::default(),
                MonitorOptions {
                    poll_interval: Duration::from_millis(10),
                    notification_duration: Duration::from_secs(5),
                    skip_policy: SkipPolicy::Reevaluate,
                    log_path: None,
                },
            )
            .unwrap(),
        );
        let controller = Controller::new(
            monitor.clone(),
            player.clone(),
            sink.clone(),
            Duration::from_secs(5),
            None,
        );
        (player, sink, monitor, controller)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("now".parse::<ControlCommand>(), Ok(ControlCommand::ShowCurrent));
        assert_eq!(" index 3 ".parse::<ControlCommand>(), Ok(ControlCommand::ShowIndex(3)));
        assert_eq!("PAUSE".parse::<ControlCommand>(), Ok(ControlCommand::PlayPause));
        assert_eq!("quit".parse::<ControlCommand>(), Ok(ControlCommand::Quit));
        assert!("index".parse::<ControlCommand>().is_err());
        assert!("index two".parse::<ControlCommand>().is_err());
        assert!("dance".parse::<ControlCommand>().is_err());
    }

    #[test]
    fn test_show_by_index() {
        let (player, sink, monitor, controller) = setup();
        player.push_playing("First");
        player.push_playing("Second");
        monitor.poll_once();
        monitor.poll_once();

        assert_eq!(controller.show_current().unwrap().title, "Second");
        assert_eq!(controller.show_by_index(2).unwrap().title, "First");
        assert!(matches!(controller.show_by_index(3), Err(AppError::NotFound(3))));
        assert_eq!(sink.summaries(), vec!["First", "Second", "Second", "First"]);
    }

    #[test]
    fn test_show_current_movie_asks_time_left() {
        let (player, sink, monitor, controller) = setup();
        let mut meta = track("Heat");
        meta.media_type = "movie".to_string();
        meta.duration_secs = Some(10_200);
        player.push(Ok(Some(meta)));
        monitor.poll_once();

        *player.active.lock() = Some(1);
        *player.time_left.lock() = Some(3_600);
        controller.show_current().unwrap();

        let shown = sink.shown.lock();
        assert!(shown[1].body.ends_with("Duration: 02:50:00 (Time left: 01:00:00)"));
    }

    #[test]
    fn test_toggle_with_active_player() {
        let (player, _sink, _monitor, controller) = setup();
        *player.active.lock() = Some(0);
        controller.toggle_play_pause().unwrap();
        assert_eq!(player.sent(), vec![PlayerCommand::PlayPause { player_id: 0 }]);
    }

    #[test]
    fn test_toggle_reopens_saved_position() {
        let (player, _sink, monitor, controller) = setup();
        *player.position.lock() = Some(3);
        player.push_playing("Song");
        monitor.poll_once();

        // Player stopped: no active player
        controller.toggle_play_pause().unwrap();
        controller.toggle_play_pause().unwrap();
        assert_eq!(player.sent(), vec![PlayerCommand::Open { position: 3 }]);
    }

    #[test]
    fn test_toggle_plugin_stream() {
        let (player, _sink, monitor, controller) = setup();
        let mut meta = track("Stream");
        meta.mediapath = Some("plugin://plugin.audio.radio/".to_string());
        player.push(Ok(Some(meta)));
        monitor.poll_once();

        *player.active.lock() = Some(0);
        *player.playing.lock() = true;
        controller.toggle_play_pause().unwrap();

        *player.active.lock() = None;
        controller.toggle_play_pause().unwrap();

        assert_eq!(
            player.sent(),
            vec![
                PlayerCommand::Stop { player_id: 0 },
                PlayerCommand::OpenFile {
                    file: "plugin://plugin.audio.radio/".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_previous_and_system_commands() {
        let (player, _sink, _monitor, controller) = setup();
        controller.previous_track().unwrap();
        *player.active.lock() = Some(1);
        controller.previous_track().unwrap();
        controller.reboot_system().unwrap();
        controller.shutdown_system().unwrap();

        assert_eq!(
            player.sent(),
            vec![
                PlayerCommand::PreviousTrack { player_id: 1 },
                PlayerCommand::SystemReboot,
                PlayerCommand::SystemShutdown,
            ]
        );
    }

    #[test]
    fn test_status_and_quit() {
        let (player, _sink, monitor, controller) = setup();
        player.push_playing("Song");
        monitor.poll_once();

        let status = controller.status();
        assert_eq!(status.connection, ConnectionStatus::Reachable);
        assert_eq!(status.events, 1);
        assert_eq!(status.now_playing.as_deref(), Some("Song"));
        assert!(String::from_utf8(controller.export()).unwrap().contains("\tSong\t"));

        controller.start();
        controller.quit();
        // Quitting twice is harmless
        controller.quit();
    }
}
