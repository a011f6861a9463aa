pub mod commands;
pub mod config;
pub mod errors;
pub mod history;
pub mod kodi;
pub mod monitor;
pub mod notifications;
pub mod skip_filter;

#[cfg(test)]
mod testing;

use anyhow::Context;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use commands::{ControlCommand, Controller};
use config::Settings;
use errors::{AppError, AppResult};
use kodi::{KodiClient, RemotePlayer};
use monitor::{MonitorOptions, PlaybackMonitor};
use notifications::{DesktopNotifier, NotificationSink};
use skip_filter::SkipFilter;

/// Build the monitor and its collaborators from settings.
pub fn build_controller(settings: &Settings) -> AppResult<Controller> {
    let remote: Arc<dyn RemotePlayer> = Arc::new(KodiClient::new(settings)?);
    let sink: Arc<dyn NotificationSink> = Arc::new(DesktopNotifier::new());
    let options = MonitorOptions::from(settings);
    let log_path = options.log_path.clone();

    let monitor = Arc::new(PlaybackMonitor::new(
        remote.clone(),
        sink.clone(),
        SkipFilter::new(&settings.skip_titles),
        options,
    )?);

    Ok(Controller::new(
        monitor,
        remote,
        sink,
        settings.notification_duration(),
        log_path,
    ))
}

fn dispatch(
    controller: &Controller,
    command: ControlCommand,
    out: &mut impl Write,
) -> AppResult<()> {
    match command {
        ControlCommand::ShowCurrent => {
            controller.show_current()?;
        }
        ControlCommand::ShowIndex(index) => {
            controller.show_by_index(index)?;
        }
        ControlCommand::PlayPause => controller.toggle_play_pause()?,
        ControlCommand::Previous => controller.previous_track()?,
        ControlCommand::Stop => controller.stop()?,
        ControlCommand::ShowLog => {
            if let Some(path) = controller.log_path() {
                writeln!(out, "# {}", path.display())?;
            }
            out.write_all(&controller.export())?;
        }
        ControlCommand::Status => {
            let status = serde_json::to_string_pretty(&controller.status())
                .map_err(|e| AppError::Internal(e.to_string()))?;
            writeln!(out, "{}", status)?;
        }
        ControlCommand::Shutdown => controller.shutdown_system()?,
        ControlCommand::Reboot => controller.reboot_system()?,
        ControlCommand::Quit => controller.quit(),
    }
    Ok(())
}

/// Poll Kodi in the background and serve commands from stdin until `quit`
/// or end of input.
pub fn run(settings: Settings) -> anyhow::Result<()> {
    log::info!("Watching Kodi at {}", settings.base_url());

    let controller = build_controller(&settings).context("Failed to start kodi-playing")?;
    controller.start();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<ControlCommand>() {
            Ok(ControlCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = dispatch(&controller, command, &mut stdout) {
                    // Lookups out of range are answered, not logged
                    if !matches!(e, AppError::NotFound(_)) {
                        log::warn!("{:?} failed: {}", command, e);
                    }
                    writeln!(stdout, "{}", e)?;
                }
            }
            Err(e) => writeln!(stdout, "{}", e)?,
        }
        stdout.flush()?;
    }

    controller.quit();
    Ok(())
}
