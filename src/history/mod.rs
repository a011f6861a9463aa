pub mod models;

use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
pub use models::PlaybackEvent;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordered, append-only record of the session's notified events.
///
/// Clones share the same log, so the monitor thread can append while a
/// control surface reads. Readers always see whole events.
#[derive(Clone, Default)]
pub struct HistoryLog {
    events: Arc<RwLock<Vec<PlaybackEvent>>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: PlaybackEvent) {
        let mut events = self.events.write();
        events.push(event);
        log::debug!("[HistoryLog] {} events recorded", events.len());
    }

    /// 1 is the most recent event, 2 the one before that, and so on.
    pub fn lookup_by_index(&self, index: usize) -> AppResult<PlaybackEvent> {
        let events = self.events.read();
        if index == 0 || index > events.len() {
            return Err(AppError::NotFound(index));
        }
        Ok(events[events.len() - index].clone())
    }

    pub fn latest(&self) -> Option<PlaybackEvent> {
        self.events.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Copy of the current sequence, oldest first.
    pub fn snapshot(&self) -> Vec<PlaybackEvent> {
        self.events.read().clone()
    }

    /// Tab separated rows: timestamp, title, artist, album.
    pub fn export(&self) -> Vec<u8> {
        let events = self.snapshot();
        let mut out = String::new();
        for event in &events {
            out.push_str(&render_row(event));
        }
        out.into_bytes()
    }

    /// Rewrite `path` with the full export.
    pub fn persist(&self, path: &Path) -> AppResult<()> {
        fs::write(path, self.export())?;
        Ok(())
    }

    /// Create or truncate the log file left by a previous session.
    pub fn reset_file(path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::File::create(path)?;
        log::info!("[HistoryLog] Play log at {:?}", path);
        Ok(())
    }
}

fn field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

fn render_row(event: &PlaybackEvent) -> String {
    format!(
        "{}\t{}\t{}\t{}\n",
        event.timestamp.format(TIMESTAMP_FORMAT),
        field(&event.title),
        field(event.artist.as_deref().unwrap_or_default()),
        field(event.album.as_deref().unwrap_or_default()),
    )
}
