//! Show command - display artifact details.

use super::{format_date, format_size, open, preview, status_label};
use anyhow::Result;
use colored::Colorize;

pub fn run(id: &str) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(id)?;

    println!("{}", artifact.original_name.white().bold());
    println!("{}", "─".repeat(70));

    println!("  {}: {}", "ID".cyan(), artifact.id);
    println!("  {}: {}", "Kind".cyan(), artifact.kind);
    println!("  {}: {}", "Status".cyan(), status_label(artifact.status));
    println!("  {}: {}", "Size".cyan(), format_size(artifact.size_bytes as i64));
    println!(
        "  {}: {}",
        "Uploaded".cyan(),
        format_date(&app.config, &artifact.uploaded_at)
    );
    if let Some(processed) = &artifact.processed_at {
        println!(
            "  {}: {}",
            "Processed".cyan(),
            format_date(&app.config, processed)
        );
    }
    if let Some(path) = &artifact.stored_path {
        println!("  {}: {}", "Stored".cyan(), path);
    }

    if let Some(cause) = &artifact.failure_cause {
        let stage = artifact
            .failure_stage
            .map(|s| format!(" during {}", s))
            .unwrap_or_default();
        println!();
        println!("{}{}", "Failed".red().bold(), stage.red());
        println!("  {}", cause);
    }

    if let Some(summary) = &artifact.content_summary {
        println!();
        println!("{}", "Summary".white().bold());
        println!("{}", "─".repeat(70));
        println!("{}", summary);
    }

    if let Some(topics) = &artifact.topics {
        println!();
        println!("{} ({})", "Topics".white().bold(), topics.len());
        println!("{}", "─".repeat(70));
        for topic in topics {
            println!(
                "  {} {} {}",
                format!("{:>3.0}%", topic.confidence * 100.0).green(),
                topic.name,
                format!("[{}]", &topic.id[..8.min(topic.id.len())]).dimmed()
            );
            if !topic.description.is_empty() {
                println!("       {}", preview(&topic.description, 60).dimmed());
            }
        }
    }

    if !artifact.raw_metadata.is_empty() {
        println!();
        println!("{}", "Metadata".white().bold());
        println!("{}", "─".repeat(70));
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact.raw_metadata)?.dimmed()
        );
    }

    Ok(())
}
