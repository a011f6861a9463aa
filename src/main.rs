use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use kodi_playing_lib::config::{get_settings_path, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (default: ~/.kodi-playing/settings.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Kodi host name or address
    #[arg(long)]
    address: Option<String>,

    /// Kodi web server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Seconds between polls
    #[arg(short, long)]
    wait: Option<u64>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let path = args.config.unwrap_or_else(get_settings_path);
    let mut settings =
        Settings::load(&path).with_context(|| format!("Invalid settings in {:?}", path))?;

    if let Some(address) = args.address {
        settings.address = address;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(wait) = args.wait {
        settings.wait = wait.max(1);
    }

    kodi_playing_lib::run(settings)
}
