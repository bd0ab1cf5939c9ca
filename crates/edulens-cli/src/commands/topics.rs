//! Topics command - topics of an artifact, most confident first.

use super::{open, status_label};
use anyhow::Result;
use colored::Colorize;

pub fn run(artifact_id: &str) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(artifact_id)?;
    let topics = app.service.list_topics(&artifact.id)?;

    println!(
        "{} {}",
        "Topics of".cyan().bold(),
        artifact.original_name.white().bold()
    );
    println!("{}", "─".repeat(70));

    if topics.is_empty() {
        println!(
            "{}",
            format!("No topics yet (artifact is {}).", status_label(artifact.status)).dimmed()
        );
        return Ok(());
    }

    for topic in &topics {
        println!();
        println!(
            "{} {} {}",
            topic.name.white().bold(),
            format!("[{}]", &topic.id[..8.min(topic.id.len())]).dimmed(),
            format!("{:.0}%", topic.confidence * 100.0).green()
        );
        if !topic.description.is_empty() {
            println!("  {}", topic.description);
        }
        println!(
            "  {} · ~{} min",
            topic.difficulty.as_str().yellow(),
            topic.estimated_minutes
        );
        if !topic.key_concepts.is_empty() {
            println!("  {}", topic.key_concepts.join(", ").dimmed());
        }
    }

    println!();
    println!(
        "{}",
        "Generate questions with 'edulens questions generate <topic-id>'.".dimmed()
    );

    Ok(())
}
