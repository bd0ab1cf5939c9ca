//! Stats command - per-artifact or whole-store statistics.

use super::{format_size, open, App};
use anyhow::Result;
use colored::Colorize;

pub fn run(artifact: Option<String>) -> Result<()> {
    let app = open()?;
    match artifact {
        Some(id) => artifact_stats(&app, &id),
        None => store_stats(&app),
    }
}

fn artifact_stats(app: &App, id: &str) -> Result<()> {
    let artifact = app.service.find_artifact(id)?;
    let stats = app.service.get_stats(&artifact.id)?;

    println!(
        "{} {}",
        "Statistics for".cyan().bold(),
        artifact.original_name.white().bold()
    );
    println!("{}", "─".repeat(50));
    println!("  Topics: {}", stats.topic_count.to_string().green());
    println!("  Questions: {}", stats.question_count);
    println!("  Sessions: {}", stats.session_count);
    println!(
        "  Average topic confidence: {:.0}%",
        stats.average_topic_confidence * 100.0
    );

    Ok(())
}

fn store_stats(app: &App) -> Result<()> {
    let stats = app.service.store_stats()?;

    println!("{}", "EduLens Statistics".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Artifacts".white().bold());
    println!("  Total: {}", stats.total_artifacts.to_string().green());
    for status in ["pending", "processing", "completed", "failed"] {
        if let Some(count) = stats.artifacts_by_status.get(status) {
            println!("    {}: {}", status, count);
        }
    }
    for (kind, count) in &stats.artifacts_by_kind {
        let icon = match kind.as_str() {
            "document" => "📄",
            "audio_video" => "🎬",
            _ => "📁",
        };
        println!("    {} {}: {}", icon, kind, count);
    }

    println!();
    println!("{}", "Study Content".white().bold());
    println!("  Chunks: {}", stats.total_chunks);
    println!("  Topics: {}", stats.total_topics);
    println!("  Questions: {}", stats.total_questions);
    println!("  Sessions: {}", stats.total_sessions);

    println!();
    println!("{}", "Storage".white().bold());
    println!("  Database size: {}", format_size(stats.database_size_bytes));

    Ok(())
}
