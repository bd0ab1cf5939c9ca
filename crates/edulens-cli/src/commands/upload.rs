//! Upload, process and retry commands.

use super::{open, runtime, status_label, App};
use anyhow::{Context, Result};
use colored::Colorize;
use edulens_core::{ArtifactId, ArtifactKind, ArtifactStatus};
use edulens_ingest::UploadRequest;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Register files and, unless `no_wait`, process them.
pub fn run(paths: &[PathBuf], kind: Option<String>, no_wait: bool) -> Result<()> {
    let kind = match kind {
        Some(k) => Some(
            ArtifactKind::from_str(&k)
                .with_context(|| format!("Unknown kind '{}' (document, audio_video)", k))?,
        ),
        None => None,
    };

    let app = open()?;
    let mut queued: Vec<ArtifactId> = Vec::new();
    let mut failed = 0;

    for path in paths {
        let mut request = UploadRequest::from_path(path);
        if let Some(kind) = kind {
            request = request.with_kind(kind);
        }

        match app.service.submit(request) {
            Ok(submission) => {
                let artifact = app.service.get_artifact(&submission.artifact_id)?;
                if submission.created {
                    println!(
                        "{} {} {}",
                        "Uploaded:".green().bold(),
                        artifact.original_name,
                        format!("[{}]", artifact.short_id()).dimmed()
                    );
                } else {
                    println!(
                        "{} {} is already uploaded as {} ({})",
                        "Note:".yellow().bold(),
                        path.display(),
                        artifact.short_id(),
                        status_label(artifact.status)
                    );
                }
                if artifact.status == ArtifactStatus::Pending {
                    queued.push(artifact.id);
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "Rejected:".red().bold(), path.display(), e);
            }
        }
    }

    if failed == paths.len() {
        anyhow::bail!("No files were uploaded");
    }

    if no_wait {
        if !queued.is_empty() {
            println!();
            println!(
                "{}",
                format!(
                    "{} artifacts pending. Run 'edulens process' to process them.",
                    queued.len()
                )
                .dimmed()
            );
        }
        return Ok(());
    }

    run_pipeline(&app, queued)
}

/// Recover from an interrupted run and process every pending artifact.
pub fn process() -> Result<()> {
    let app = open()?;
    let interrupted_before = app
        .service
        .list_artifacts(Some(ArtifactStatus::Processing))?
        .len();

    let pending = app.service.recover()?;
    if interrupted_before > 0 {
        println!(
            "{} {} interrupted artifacts marked failed. Use 'edulens retry <id>' to run them again.",
            "Note:".yellow().bold(),
            interrupted_before
        );
    }

    if pending.is_empty() {
        println!("{}", "No pending artifacts.".yellow());
        return Ok(());
    }

    run_pipeline(&app, pending)
}

/// Reset an artifact to pending and, unless `no_wait`, process it again.
pub fn retry(id: &str, no_wait: bool) -> Result<()> {
    let app = open()?;
    let artifact = app.service.find_artifact(id)?;

    app.service.resubmit(&artifact.id)?;
    println!(
        "{} {} {}",
        "Reset:".green().bold(),
        artifact.original_name,
        format!("[{}]", artifact.short_id()).dimmed()
    );

    if no_wait {
        return Ok(());
    }
    run_pipeline(&app, vec![artifact.id])
}

/// Run the worker pool over `ids`, polling stored status for progress.
fn run_pipeline(app: &App, ids: Vec<ArtifactId>) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let rt = runtime()?;
    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("processing");

    rt.block_on(async {
        let pool = app.service.start_workers(&app.config);
        for id in &ids {
            pool.enqueue(id.clone()).await?;
        }
        let workers = tokio::spawn(pool.shutdown());

        loop {
            pb.set_position(finished(app, &ids) as u64);
            if workers.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        workers.await.context("Pipeline workers stopped unexpectedly")?;
        Ok::<_, anyhow::Error>(())
    })?;

    pb.finish_and_clear();
    report(app, &ids)
}

fn finished(app: &App, ids: &[ArtifactId]) -> usize {
    ids.iter()
        .filter(|id| {
            app.service
                .get_artifact(id)
                .map(|a| a.status.is_terminal())
                .unwrap_or(true)
        })
        .count()
}

fn report(app: &App, ids: &[ArtifactId]) -> Result<()> {
    let mut completed = 0;
    let mut failed = 0;

    for id in ids {
        let Ok(artifact) = app.service.get_artifact(id) else {
            continue;
        };

        match artifact.status {
            ArtifactStatus::Completed => {
                completed += 1;
                let topics = artifact.topics.as_ref().map(Vec::len).unwrap_or(0);
                let chunks = artifact
                    .raw_metadata
                    .get("chunk_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0);
                println!(
                    "  {} {} {} ({} chunks, {} topics)",
                    "●".green(),
                    artifact.original_name,
                    format!("[{}]", artifact.short_id()).dimmed(),
                    chunks,
                    topics
                );
            }
            ArtifactStatus::Failed => {
                failed += 1;
                let stage = artifact
                    .failure_stage
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown stage".to_string());
                println!(
                    "  {} {} {} failed during {}",
                    "✗".red(),
                    artifact.original_name,
                    format!("[{}]", artifact.short_id()).dimmed(),
                    stage
                );
                if let Some(cause) = &artifact.failure_cause {
                    println!("    {}", cause.dimmed());
                }
            }
            status => println!(
                "  {} {} {}",
                "○".yellow(),
                artifact.original_name,
                status_label(status)
            ),
        }
    }

    println!();
    println!("{} {} artifacts", "Completed:".green().bold(), completed);
    if failed > 0 {
        println!("{} {} artifacts", "Failed:".red().bold(), failed);
    }

    Ok(())
}
