//! List command - uploaded artifacts, newest first.

use super::{format_date, format_size, open, status_label};
use anyhow::{Context, Result};
use colored::Colorize;
use edulens_core::{ArtifactKind, ArtifactStatus};

pub fn run(status: Option<String>) -> Result<()> {
    let status = match status {
        Some(s) => Some(
            ArtifactStatus::from_str(&s)
                .with_context(|| format!("Unknown status '{}'", s))?,
        ),
        None => None,
    };

    let app = open()?;
    let artifacts = app.service.list_artifacts(status)?;

    if artifacts.is_empty() {
        println!(
            "{}",
            "No artifacts yet. Use 'edulens upload <file>' to add material.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Artifacts".cyan().bold());
    println!("{}", "─".repeat(70));

    for artifact in &artifacts {
        let icon = match artifact.kind {
            ArtifactKind::Document => "📄",
            ArtifactKind::AudioVideo => "🎬",
        };
        println!(
            "{} {} {} {}",
            icon,
            artifact.short_id().dimmed(),
            artifact.original_name.white().bold(),
            status_label(artifact.status)
        );
        println!(
            "   {} · {}",
            format_date(&app.config, &artifact.uploaded_at).dimmed(),
            format_size(artifact.size_bytes as i64).dimmed()
        );
    }

    println!();
    println!("{} artifacts", artifacts.len());

    Ok(())
}
