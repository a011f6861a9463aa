pub mod client;
pub mod models;
pub mod traits;

pub use client::KodiClient;
pub use models::{is_plugin_path, PlaybackMetadata};
pub use traits::{PlayerCommand, RemotePlayer};
