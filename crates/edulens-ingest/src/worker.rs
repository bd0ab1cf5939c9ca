//! Background workers that advance queued artifacts.
//!
//! A fixed number of tokio tasks share one bounded queue of artifact ids.
//! A full queue is reported to the submitter instead of growing without
//! limit; an artifact that is never enqueued stays `pending` and can be
//! picked up later by [`Orchestrator::recover`].

use crate::error::{IngestError, IngestResult};
use crate::orchestrator::{AdvanceOutcome, Orchestrator};
use edulens_config::ProcessingConfig;
use edulens_core::ArtifactId;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pool of pipeline workers fed through a bounded queue.
pub struct WorkerPool {
    sender: mpsc::Sender<ArtifactId>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks sharing a queue of `capacity` slots.
    ///
    /// Must be called from within a tokio runtime. Zero values are raised
    /// to one.
    pub fn start(orchestrator: Arc<Orchestrator>, workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<ArtifactId>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker| {
                let orchestrator = Arc::clone(&orchestrator);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(artifact_id) = next else {
                            break;
                        };
                        run_one(worker, &orchestrator, &artifact_id).await;
                    }
                    debug!("Worker {} stopped", worker);
                })
            })
            .collect();

        info!("Started {} pipeline workers", workers);
        Self {
            sender,
            workers: handles,
        }
    }

    pub fn from_config(orchestrator: Arc<Orchestrator>, config: &ProcessingConfig) -> Self {
        Self::start(orchestrator, config.max_concurrent_jobs, config.queue_capacity)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue an artifact without waiting for room.
    pub fn try_enqueue(&self, artifact_id: impl Into<ArtifactId>) -> IngestResult<()> {
        match self.sender.try_send(artifact_id.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(id)) => {
                warn!("Work queue is full, artifact {} stays pending", id);
                Err(IngestError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(IngestError::QueueClosed),
        }
    }

    /// Queue an artifact, waiting for room if the queue is full.
    pub async fn enqueue(&self, artifact_id: impl Into<ArtifactId>) -> IngestResult<()> {
        self.sender
            .send(artifact_id.into())
            .await
            .map_err(|_| IngestError::QueueClosed)
    }

    /// Stop accepting work, drain the queue and wait for every worker.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!("Pipeline worker panicked: {}", e);
            }
        }
        debug!("All pipeline workers stopped");
    }
}

async fn run_one(worker: usize, orchestrator: &Orchestrator, artifact_id: &str) {
    debug!("Worker {} picked up artifact {}", worker, artifact_id);
    match orchestrator.advance(artifact_id).await {
        Ok(AdvanceOutcome::Completed { chunks, topics }) => {
            debug!(
                "Worker {} finished {} ({} chunks, {} topics)",
                worker, artifact_id, chunks, topics
            );
        }
        Ok(AdvanceOutcome::Failed { stage, .. }) => {
            debug!("Worker {} saw {} fail during {}", worker, artifact_id, stage);
        }
        Ok(AdvanceOutcome::Skipped { status }) => {
            debug!("Worker {} skipped {} ({})", worker, artifact_id, status);
        }
        Err(e) => error!("Worker {} could not process {}: {}", worker, artifact_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DefaultExtractor;
    use crate::orchestrator::UploadRequest;
    use crate::service::Capabilities;
    use crate::test_support::{HashEmbedder, ScriptedModel};
    use edulens_core::ArtifactStatus;
    use edulens_db::Database;
    use tempfile::tempdir;

    fn orchestrator(db: &Database, uploads: &std::path::Path) -> Arc<Orchestrator> {
        let config = ProcessingConfig::default();
        let capabilities = Capabilities::new(
            Arc::new(ScriptedModel::failing()),
            Arc::new(HashEmbedder),
            Arc::new(DefaultExtractor::from_config(&config)),
        );
        Arc::new(Orchestrator::new(db.clone(), &capabilities, &config, uploads))
    }

    #[tokio::test]
    async fn test_pool_processes_queue_then_shuts_down() {
        let db = Database::open_in_memory().unwrap();
        let uploads = tempdir().unwrap();
        let sources = tempdir().unwrap();
        let orchestrator = orchestrator(&db, uploads.path());

        let mut ids = Vec::new();
        for i in 0..3 {
            let path = sources.path().join(format!("notes-{}.txt", i));
            std::fs::write(&path, format!("Lecture {} covers photosynthesis.", i)).unwrap();
            let submission = orchestrator.submit(UploadRequest::from_path(&path)).unwrap();
            ids.push(submission.artifact_id);
        }

        let pool = WorkerPool::start(Arc::clone(&orchestrator), 2, 8);
        assert_eq!(pool.worker_count(), 2);
        for id in &ids {
            pool.enqueue(id.clone()).await.unwrap();
        }
        pool.shutdown().await;

        for id in &ids {
            let artifact = db.get_artifact(id).unwrap();
            assert_eq!(artifact.status, ArtifactStatus::Completed);
            assert_eq!(artifact.topics.unwrap().len(), 1);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_try_enqueue_reports_full_queue() {
        let db = Database::open_in_memory().unwrap();
        let uploads = tempdir().unwrap();
        let pool = WorkerPool::start(orchestrator(&db, uploads.path()), 1, 1);

        // The worker cannot run until this task yields, so the slot stays taken.
        pool.try_enqueue("first").unwrap();
        let err = pool.try_enqueue("second").unwrap_err();
        assert!(matches!(err, IngestError::QueueFull));

        pool.shutdown().await;
    }
}
