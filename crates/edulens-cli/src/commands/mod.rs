//! CLI command implementations.

pub mod ask;
pub mod config;
pub mod delete;
pub mod init;
pub mod list;
pub mod questions;
pub mod session;
pub mod show;
pub mod stats;
pub mod topics;
pub mod upload;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use edulens_config::{AppPaths, Config};
use edulens_core::ArtifactStatus;
use edulens_ingest::StudyService;
use tokio::runtime::Runtime;

/// Everything a command needs: configuration plus the study service.
pub struct App {
    pub config: Config,
    pub service: StudyService,
}

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load configuration and open the service, ensuring edulens is initialized.
pub fn open() -> Result<App> {
    let paths = get_paths()?;

    if !paths.is_initialized() {
        anyhow::bail!("EduLens is not initialized. Run 'edulens init' first.");
    }

    let config = Config::load_from(&paths.config_file).context("Failed to load configuration")?;
    if !config.ui.color {
        colored::control::set_override(false);
    }

    tracing::debug!("Uploads are stored in {}", config.uploads_dir(&paths).display());
    let service = StudyService::open(&config, &paths).context("Failed to open the study store")?;
    Ok(App { config, service })
}

/// Create the async runtime used for pipeline and model calls.
pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a timestamp in local time using `ui.date_format`.
pub fn format_date(config: &Config, at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format(&config.ui.date_format)
        .to_string()
}

/// Status word coloured by state.
pub fn status_label(status: ArtifactStatus) -> ColoredString {
    match status {
        ArtifactStatus::Pending => status.as_str().yellow(),
        ArtifactStatus::Processing => status.as_str().blue(),
        ArtifactStatus::Completed => status.as_str().green(),
        ArtifactStatus::Failed => status.as_str().red(),
    }
}

/// First `max` characters of `text` on one line, with `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
