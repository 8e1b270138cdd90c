//! Batch controller: snapshot holder and presentation-facing operations
//!
//! Holds the current `Arc<BatchState>` behind a `parking_lot::RwLock` and
//! dispatches batch runs to the worker task over an mpsc channel. All
//! mutations are copy-on-write: a private clone is edited and swapped in, so
//! observers holding an older snapshot never see a partial update.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::state::{BatchState, MAX_BATCH_SIZE};
use crate::types::{is_supported_media_type, ImageBlob, JobStatus, Operation, Quality};

/// One uploaded file handed to `start_batch`
#[derive(Debug, Clone)]
pub struct JobInput {
    pub filename: String,
    pub source: ImageBlob,
}

/// A unit of work for the batch worker: the ids to process and the
/// generation they were scheduled under
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub generation: u64,
    pub pending: Vec<Uuid>,
}

/// Controller owning the batch snapshot and the run channel
pub struct BatchController {
    snapshot: RwLock<Arc<BatchState>>,
    sender: mpsc::Sender<BatchRun>,
}

impl BatchController {
    /// Create a controller and the receiver its worker consumes
    pub fn new() -> (Self, mpsc::Receiver<BatchRun>) {
        let (sender, receiver) = mpsc::channel(1000);
        let controller = Self {
            snapshot: RwLock::new(Arc::new(BatchState::empty())),
            sender,
        };
        (controller, receiver)
    }

    /// Current immutable snapshot
    pub fn snapshot(&self) -> Arc<BatchState> {
        Arc::clone(&self.snapshot.read())
    }

    /// Edit a private clone of the state and publish it as the new snapshot
    fn mutate<R>(&self, f: impl FnOnce(&mut BatchState) -> R) -> (Arc<BatchState>, R) {
        let mut guard = self.snapshot.write();
        let mut next = BatchState::clone(&guard);
        let result = f(&mut next);
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        (next, result)
    }

    /// Validate an upload and start a new batch, replacing any prior one
    ///
    /// Rejects empty uploads, uploads over `MAX_BATCH_SIZE`, and unsupported
    /// media types before any job record is created.
    pub async fn start_batch(
        &self,
        operation: Operation,
        quality: Quality,
        uploads: Vec<JobInput>,
    ) -> Result<Arc<BatchState>> {
        if uploads.is_empty() {
            return Err(Error::InvalidRequest("No images provided".to_string()));
        }
        if uploads.len() > MAX_BATCH_SIZE {
            return Err(Error::InvalidRequest(format!(
                "Too many images: {} exceeds the maximum of {}",
                uploads.len(),
                MAX_BATCH_SIZE
            )));
        }
        for upload in &uploads {
            if !is_supported_media_type(&upload.source.media_type) {
                return Err(Error::InvalidRequest(format!(
                    "Unsupported media type '{}' for '{}'",
                    upload.source.media_type, upload.filename
                )));
            }
        }

        let count = uploads.len();
        let (state, _) = self.mutate(|state| {
            *state = BatchState::new_batch(
                state.generation + 1,
                operation,
                quality,
                uploads
                    .into_iter()
                    .map(|u| (u.filename, u.source))
                    .collect(),
            );
        });

        tracing::info!(
            "Started batch generation {} with {} jobs ({})",
            state.generation,
            count,
            operation.display_name()
        );

        let run = BatchRun {
            generation: state.generation,
            pending: state.jobs.iter().map(|j| j.id).collect(),
        };
        self.sender
            .send(run)
            .await
            .map_err(|e| Error::Internal(format!("Failed to dispatch batch run: {}", e)))?;

        Ok(state)
    }

    /// Discard the whole batch
    ///
    /// Bumps the generation so in-flight completions of the discarded batch
    /// are dropped at write time and stale workers exit at their next pop.
    pub fn reset(&self) -> Arc<BatchState> {
        let (state, _) = self.mutate(|state| {
            *state = BatchState::cleared(state.generation + 1);
        });
        tracing::info!("Batch reset; now at generation {}", state.generation);
        state
    }

    /// Re-enqueue one terminal job as a fresh single-record run
    pub async fn retry_job(&self, id: Uuid) -> Result<Arc<BatchState>> {
        let (state, requeued) = self.mutate(|state| state.requeue_job(id));
        if !requeued {
            return Err(Error::JobNotFound(format!(
                "No terminal job {} in the active batch",
                id
            )));
        }

        tracing::info!("Retrying job {}", id);
        let run = BatchRun {
            generation: state.generation,
            pending: vec![id],
        };
        self.sender
            .send(run)
            .await
            .map_err(|e| Error::Internal(format!("Failed to dispatch retry run: {}", e)))?;

        Ok(state)
    }

    /// Flip selection membership of a `done` job
    pub fn toggle_selection(&self, id: Uuid) -> Arc<BatchState> {
        let (state, toggled) = self.mutate(|state| state.toggle_selection(id));
        if !toggled {
            tracing::debug!("Ignored selection toggle for non-done job {}", id);
        }
        state
    }

    /// Replace the selection with all currently `done` jobs
    pub fn select_all_done(&self) -> Arc<BatchState> {
        let (state, _) = self.mutate(|state| state.select_all_done());
        state
    }

    /// Empty the selection
    pub fn clear_selection(&self) -> Arc<BatchState> {
        let (state, _) = self.mutate(|state| state.clear_selection());
        state
    }

    /// Whether `generation` still tags the active batch
    pub fn is_current(&self, generation: u64) -> bool {
        self.snapshot.read().generation == generation
    }

    /// Worker-side `queued -> processing` transition, dropped when stale
    pub fn begin_job(&self, generation: u64, id: Uuid) -> bool {
        self.apply_if_current(generation, id, |state| state.mark_processing(id))
    }

    /// Worker-side `processing -> done` transition, dropped when stale
    pub fn finish_job(&self, generation: u64, id: Uuid, output: ImageBlob) -> bool {
        self.apply_if_current(generation, id, |state| state.complete_job(id, output))
    }

    /// Worker-side `processing -> error` transition, dropped when stale
    pub fn fail_job(&self, generation: u64, id: Uuid, message: String) -> bool {
        self.apply_if_current(generation, id, |state| state.fail_job(id, message))
    }

    fn apply_if_current(
        &self,
        generation: u64,
        id: Uuid,
        f: impl FnOnce(&mut BatchState) -> bool,
    ) -> bool {
        let mut guard = self.snapshot.write();
        if guard.generation != generation {
            tracing::debug!(
                "Dropping stale write for job {} (generation {} vs active {})",
                id,
                generation,
                guard.generation
            );
            return false;
        }
        let mut next = BatchState::clone(&guard);
        let applied = f(&mut next);
        if applied {
            *guard = Arc::new(next);
        }
        applied
    }

    /// Count of terminal jobs in the active batch, for worker summary logs
    pub fn terminal_counts(&self) -> (usize, usize) {
        let snapshot = self.snapshot.read();
        let done = snapshot
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Done)
            .count();
        let failed = snapshot
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Error)
            .count();
        (done, failed)
    }
}
