//! Study session commands.

use super::{format_date, open};
use anyhow::{Context, Result};
use colored::Colorize;

pub fn create(artifact_id: &str, name: &str) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(artifact_id)?;
    let session_id = app.service.create_session(&artifact.id, name)?;

    println!(
        "{} session '{}' on {}",
        "Started".green().bold(),
        name,
        artifact.original_name
    );
    println!("  ID: {}", session_id);

    Ok(())
}

pub fn list(artifact_id: &str) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(artifact_id)?;
    let sessions = app.service.list_sessions(&artifact.id)?;

    println!(
        "{} {}",
        "Sessions on".cyan().bold(),
        artifact.original_name.white().bold()
    );
    println!("{}", "─".repeat(70));

    if sessions.is_empty() {
        println!(
            "{}",
            "No sessions yet. Use 'edulens session create <artifact> <name>'.".dimmed()
        );
        return Ok(());
    }

    for session in &sessions {
        println!(
            "  {} {} · last used {}",
            session.name.white().bold(),
            session.id.dimmed(),
            format_date(&app.config, &session.last_accessed_at)
        );
        println!(
            "    {} topics done, {} questions answered, {} correct",
            session.progress.completed_topics.len(),
            session.progress.answered_questions.len(),
            session.progress.correct_answers
        );
    }

    Ok(())
}

/// Print the session's progress, or replace it when `json` is given.
pub fn progress(session_id: &str, json: Option<String>) -> Result<()> {
    let app = open()?;

    if let Some(json) = json {
        let value: serde_json::Value =
            serde_json::from_str(&json).context("Progress must be valid JSON")?;
        app.service.update_progress_json(session_id, value)?;
        println!("{} Progress saved.", "✓".green());
        return Ok(());
    }

    let session = app.service.get_session(session_id)?;
    println!("{} {}", "Session".cyan().bold(), session.name.white().bold());
    println!("{}", "─".repeat(50));
    println!("{}", serde_json::to_string_pretty(&session.progress)?);

    Ok(())
}
