//! Playback Monitor
//!
//! Polls the remote player on a fixed interval and decides whether what it
//! sees is a new event worth a notification.
//!
//! - One tick = one `get_now_playing` call, at most one history append and
//!   at most one notification
//! - An unchanged or skipped track costs no more than that call, bounded by
//!   the request timeout; a new track adds one `enrich` round with its own
//!   timeout
//! - Failures are never fatal: the next tick is the retry
//! - Runs on its own thread; shutdown is observed between ticks

use chrono::Local;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{Settings, SkipPolicy};
use crate::errors::AppError;
use crate::history::{HistoryLog, PlaybackEvent};
use crate::kodi::{PlaybackMetadata, RemotePlayer};
use crate::notifications::{Notification, NotificationSink};
use crate::skip_filter::SkipFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Reachable,
    Unreachable,
}

/// Where playback can be resumed after Kodi stopped the player.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResumePoint {
    pub playlist_position: Option<i64>,
    pub mediapath: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonitorState {
    pub last_known_event: Option<PlaybackEvent>,
    pub connection_status: ConnectionStatus,
    pub poll_interval: Duration,
    pub resume: ResumePoint,
}

impl MonitorState {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            last_known_event: None,
            // Nothing has answered yet
            connection_status: ConnectionStatus::Unreachable,
            poll_interval,
            resume: ResumePoint::default(),
        }
    }
}

/// Result of a single tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    NoChange,
    NewEvent(PlaybackEvent),
    Skipped(PlaybackEvent),
    Unreachable,
}

#[derive(Clone, Debug)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    pub notification_duration: Duration,
    pub skip_policy: SkipPolicy,
    /// Play log rewritten after every append.
    pub log_path: Option<PathBuf>,
}

impl From<&Settings> for MonitorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            notification_duration: settings.notification_duration(),
            skip_policy: settings.skip_policy,
            log_path: Some(settings.log_path()),
        }
    }
}

pub struct PlaybackMonitor {
    remote: Arc<dyn RemotePlayer>,
    sink: Arc<dyn NotificationSink>,
    filter: SkipFilter,
    history: HistoryLog,
    state: RwLock<MonitorState>,
    options: MonitorOptions,
}

impl PlaybackMonitor {
    /// Create a monitor. A configured play log is truncated here, so every
    /// session starts with an empty file.
    pub fn new(
        remote: Arc<dyn RemotePlayer>,
        sink: Arc<dyn NotificationSink>,
        filter: SkipFilter,
        options: MonitorOptions,
    ) -> Result<Self, AppError> {
        if let Some(path) = &options.log_path {
            HistoryLog::reset_file(path)?;
        }

        Ok(Self {
            remote,
            sink,
            filter,
            history: HistoryLog::new(),
            state: RwLock::new(MonitorState::new(options.poll_interval)),
            options,
        })
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Latest committed state.
    pub fn state(&self) -> MonitorState {
        self.state.read().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.state.read().connection_status
    }

    pub fn resume_point(&self) -> ResumePoint {
        self.state.read().resume.clone()
    }

    /// Forget the saved playlist position once it has been used.
    pub fn clear_resume_position(&self) {
        self.state.write().resume.playlist_position = None;
    }

    pub fn poll_once(&self) -> Outcome {
        match self.remote.get_now_playing() {
            Err(e) => {
                self.mark_unreachable(&e);
                Outcome::Unreachable
            }
            Ok(None) => {
                self.mark_reachable();
                let mut state = self.state.write();
                if state.last_known_event.take().is_some() {
                    log::debug!("[PlaybackMonitor] Playback stopped");
                }
                Outcome::NoChange
            }
            Ok(Some(metadata)) => {
                self.mark_reachable();
                self.evaluate(metadata)
            }
        }
    }

    fn evaluate(&self, mut metadata: PlaybackMetadata) -> Outcome {
        let unchanged = self
            .state
            .read()
            .last_known_event
            .as_ref()
            .map(|last| last.raw_identifier == metadata.raw_identifier)
            .unwrap_or(false);
        if unchanged {
            return Outcome::NoChange;
        }

        let timestamp = Local::now();
        let event = PlaybackEvent::new(&metadata, timestamp);

        if self.filter.matches(&event.title) || event.is_announcement() {
            log::debug!("[PlaybackMonitor] Skipping '{}'", event.title);
            if self.options.skip_policy == SkipPolicy::Remember {
                self.state.write().last_known_event = Some(event.clone());
            }
            return Outcome::Skipped(event);
        }

        // Extra lookups only for tracks that will be notified
        self.remote.enrich(&mut metadata);
        let event = PlaybackEvent::new(&metadata, timestamp);

        log::info!(
            "[PlaybackMonitor] Now playing: '{}' by '{}'",
            event.title,
            event.artist.as_deref().unwrap_or("unknown")
        );

        self.history.append(event.clone());

        {
            let mut state = self.state.write();
            state.last_known_event = Some(event.clone());
            state.resume = ResumePoint {
                playlist_position: metadata.playlist_position,
                mediapath: metadata.mediapath.clone(),
            };
        }

        if let Some(path) = &self.options.log_path {
            if let Err(e) = self.history.persist(path) {
                log::warn!("[PlaybackMonitor] Could not write play log {:?}: {}", path, e);
            }
        }

        self.notify(&Notification::for_event(
            &event,
            metadata.time_left_secs,
            self.options.notification_duration,
        ));

        Outcome::NewEvent(event)
    }

    fn mark_reachable(&self) {
        let mut state = self.state.write();
        if state.connection_status == ConnectionStatus::Unreachable {
            log::info!("[PlaybackMonitor] Connected to {}", self.remote.endpoint());
            state.connection_status = ConnectionStatus::Reachable;
        }
    }

    fn mark_unreachable(&self, error: &AppError) {
        let was_reachable = {
            let mut state = self.state.write();
            let was = state.connection_status == ConnectionStatus::Reachable;
            state.connection_status = ConnectionStatus::Unreachable;
            was
        };

        if was_reachable {
            log::warn!(
                "[PlaybackMonitor] Lost connection to {}: {}",
                self.remote.endpoint(),
                error
            );
            self.notify(&Notification::connection_lost(
                &self.remote.endpoint(),
                self.options.notification_duration,
            ));
        } else {
            log::debug!("[PlaybackMonitor] Still unreachable: {}", error);
        }
    }

    fn notify(&self, notification: &Notification) {
        if let Err(e) = self.sink.show(notification) {
            log::warn!("[PlaybackMonitor] Notification failed: {}", e);
        }
    }

    /// Start polling on a dedicated thread.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let interval = self.options.poll_interval;

        let thread = thread::Builder::new()
            .name("playback-monitor".to_string())
            .spawn(move || {
                log::info!("[PlaybackMonitor] Poll loop started ({:?})", interval);
                loop {
                    let outcome = self.poll_once();
                    log::trace!("[PlaybackMonitor] Tick: {:?}", outcome);

                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::info!("[PlaybackMonitor] Poll loop stopped");
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("[PlaybackMonitor] Could not start poll thread: {}", e);
                None
            }
        };

        MonitorHandle {
            shutdown_tx: Some(shutdown_tx),
            thread,
        }
    }
}

/// Owner of the poll thread.
pub struct MonitorHandle {
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Let the current tick finish, then stop the loop and wait for it.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[PlaybackMonitor] Poll thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
