//! Ask command - answers grounded in one artifact.

use super::{open, preview, runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn run(artifact_id: &str, question: &str, show_sources: bool) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(artifact_id)?;

    println!("{} {}", "Question:".cyan().bold(), question);
    println!("{}", "─".repeat(70));

    let rt = runtime()?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Reading {}", artifact.original_name));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = rt.block_on(app.service.ask(&artifact.id, question));
    pb.finish_and_clear();
    let answer = result.context("Failed to answer the question")?;

    println!("{}", "Answer:".green().bold());
    println!();
    println!("{}", answer.text);
    println!();

    if answer.used_summary {
        println!(
            "{}",
            "Answered from the artifact summary; no indexed content was available.".dimmed()
        );
    }

    if show_sources && !answer.sources.is_empty() {
        println!("{}", "─".repeat(70));
        println!("{}", "Sources:".cyan().bold());
        for (i, source) in answer.sources.iter().enumerate() {
            println!(
                "  {}. {} (similarity: {:.0}%)",
                i + 1,
                format!("chunk #{}", source.sequence_index).white(),
                source.similarity * 100.0
            );
            println!("     {}", preview(&source.excerpt, 100).dimmed());
        }
    }

    Ok(())
}
