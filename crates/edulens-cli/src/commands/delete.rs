//! Delete command.

use super::open;
use anyhow::Result;
use colored::Colorize;

pub fn run(id: &str) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(id)?;
    let stats = app.service.get_stats(&artifact.id)?;

    app.service.delete_artifact(&artifact.id)?;

    println!(
        "{} {} {}",
        "Deleted:".green().bold(),
        artifact.original_name,
        format!("[{}]", artifact.short_id()).dimmed()
    );
    println!(
        "  {} topics, {} questions, {} sessions removed",
        stats.topic_count, stats.question_count, stats.session_count
    );

    Ok(())
}
