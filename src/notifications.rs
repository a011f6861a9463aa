//! On-screen notifications.
//!
//! The monitor talks to a [`NotificationSink`]; the desktop implementation
//! goes through notify-rust. Display and thumbnail downloads happen on a
//! worker thread so a slow image server never holds up polling. Downloaded
//! thumbnails are cached on disk, keeping only the most recent few.

use crossbeam_channel::{unbounded, Sender};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::errors::{AppError, AppResult};
use crate::history::PlaybackEvent;

const APP_NAME: &str = "kodi-playing";
const APP_ICON: &str = "kodi-playing";

/// Thumbnails kept in the cache directory.
const MAX_CACHED_THUMBNAILS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub summary: String,
    pub body: String,
    /// Thumbnail URL or local icon name.
    pub icon: Option<String>,
    pub timeout: Duration,
}

impl Notification {
    /// `time_left` is only shown next to the duration of movies and
    /// episodes that are still playing.
    pub fn for_event(event: &PlaybackEvent, time_left: Option<u64>, timeout: Duration) -> Self {
        let mut lines = Vec::new();
        if let Some(artist) = &event.artist {
            lines.push(format!("Artist: {}", artist));
        }
        if let Some(album) = &event.album {
            let label = if event.episode.is_some() { "Series" } else { "Album" };
            lines.push(format!("{}: {}", label, album));
        }
        if let Some(episode) = &event.episode {
            lines.push(format!("Episode: {}", episode));
        }
        if let Some(secs) = event.duration_secs.filter(|s| *s > 0) {
            let long = secs >= 3600;
            match time_left.filter(|_| !event.is_song()) {
                Some(left) => lines.push(format!(
                    "Duration: {} (Time left: {})",
                    format_clock(secs, long),
                    format_clock(left, long)
                )),
                None => lines.push(format!("Duration: {}", format_clock(secs, long))),
            }
        }

        Self {
            summary: event.title.clone(),
            body: lines.join("\n"),
            icon: event.thumbnail.clone(),
            timeout,
        }
    }

    pub fn connection_lost(endpoint: &str, timeout: Duration) -> Self {
        Self {
            summary: format!("Unable to connect to: {}", endpoint),
            body: String::new(),
            icon: Some(APP_ICON.to_string()),
            timeout,
        }
    }
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_duration(secs: u64) -> String {
    format_clock(secs, secs >= 3600)
}

fn format_clock(secs: u64, with_hours: bool) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if with_hours {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification) -> AppResult<()>;
}

/// Desktop notifications through the freedesktop notification service.
///
/// `show` only queues; the worker thread ends when the notifier is dropped.
pub struct DesktopNotifier {
    tx: Sender<Notification>,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier {
    pub fn new() -> Self {
        let (tx, rx) = unbounded::<Notification>();
        let presenter = Presenter::new();

        let spawned = thread::Builder::new()
            .name("desktop-notifier".to_string())
            .spawn(move || {
                for notification in rx.iter() {
                    if let Err(e) = presenter.present(&notification) {
                        log::warn!("[DesktopNotifier] {}", e);
                    }
                }
            });
        if let Err(e) = spawned {
            log::error!("[DesktopNotifier] Could not start notifier thread: {}", e);
        }

        Self { tx }
    }
}

impl NotificationSink for DesktopNotifier {
    fn show(&self, notification: &Notification) -> AppResult<()> {
        log::info!(
            "[DesktopNotifier] {} | {}",
            notification.summary,
            notification.body.replace('\n', ", ")
        );

        // A zero duration means notifications are switched off
        if notification.timeout.is_zero() {
            return Ok(());
        }

        self.tx
            .send(notification.clone())
            .map_err(|_| AppError::Notification("Notifier thread is not running".to_string()))
    }
}

/// Worker side of [`DesktopNotifier`].
struct Presenter {
    http: reqwest::blocking::Client,
    thumbs_dir: Option<PathBuf>,
}

impl Presenter {
    fn new() -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            http,
            thumbs_dir: dirs::cache_dir().map(|d| d.join(APP_NAME).join("thumbs")),
        }
    }

    fn present(&self, notification: &Notification) -> AppResult<()> {
        let icon = self.resolve_icon(notification.icon.as_deref());

        let mut desktop = notify_rust::Notification::new();
        desktop
            .appname(APP_NAME)
            .summary(&notification.summary)
            .body(&notification.body)
            .icon(&icon)
            .timeout(notify_rust::Timeout::Milliseconds(
                notification.timeout.as_millis() as u32,
            ));

        #[cfg(all(unix, not(target_os = "macos")))]
        desktop.urgency(notify_rust::Urgency::Low);

        desktop
            .show()
            .map_err(|e| AppError::Notification(e.to_string()))?;

        Ok(())
    }

    /// Download a thumbnail once and return its local path.
    fn cached_thumbnail(&self, url: &str) -> Option<String> {
        let dir = self.thumbs_dir.as_ref()?;
        let path = dir.join(thumbnail_file_name(url));

        if !path.exists() {
            fs::create_dir_all(dir).ok()?;
            let bytes = self
                .http
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.bytes());
            let bytes = match bytes {
                Ok(b) => b,
                Err(e) => {
                    log::debug!("[DesktopNotifier] Thumbnail download failed: {}", e);
                    return None;
                }
            };
            let mut file = fs::File::create(&path).ok()?;
            file.write_all(&bytes).ok()?;

            match prune_thumbnails(dir, MAX_CACHED_THUMBNAILS) {
                Ok(0) => {}
                Ok(n) => log::debug!("[DesktopNotifier] Pruned {} cached thumbnails", n),
                Err(e) => log::debug!("[DesktopNotifier] Could not prune thumbnails: {}", e),
            }
        }

        Some(path.to_string_lossy().into_owned())
    }

    fn resolve_icon(&self, icon: Option<&str>) -> String {
        match icon {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => self
                .cached_thumbnail(url)
                .unwrap_or_else(|| APP_ICON.to_string()),
            Some(name) if !name.is_empty() => name.to_string(),
            _ => APP_ICON.to_string(),
        }
    }
}

fn thumbnail_file_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("{:016x}.jpg", hasher.finish())
}

/// Delete all but the `keep` most recently written files in `dir`.
/// Returns how many were removed.
fn prune_thumbnails(dir: &Path, keep: usize) -> AppResult<usize> {
    let mut files: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some((meta.modified().ok()?, entry.path()))
        })
        .collect();

    if files.len() <= keep {
        return Ok(0);
    }

    // Newest first
    files.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in files.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::debug!("[DesktopNotifier] Could not remove {:?}: {}", path, e),
        }
    }
    Ok(removed)
}
