//! Background worker driving batch runs through the transform provider
//!
//! One long-lived task consumes runs from the controller's channel. Each run
//! gets a single owned FIFO queue and a pool of `min(5, n)` logical workers
//! that loop pop-or-exit; the pop is guarded by a synchronous mutex released
//! before any await, so no job is dispatched twice even on a multi-threaded
//! runtime.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Error;
use crate::processing::controller::{BatchController, BatchRun};
use crate::providers::{TransformProvider, TransformRequest};
use crate::types::ImageBlob;

/// Maximum number of in-flight transforms per run
pub const CONCURRENCY_LIMIT: usize = 5;

/// Fallback shown when a failure carries no usable message
pub const GENERIC_TRANSFORM_ERROR: &str =
    "Failed to process the image. The model may be overloaded or the format is unsupported.";

/// Worker consuming batch runs in the background
pub struct BatchWorker {
    controller: Arc<BatchController>,
    provider: Arc<dyn TransformProvider>,
}

impl BatchWorker {
    pub fn new(controller: Arc<BatchController>, provider: Arc<dyn TransformProvider>) -> Self {
        Self {
            controller,
            provider,
        }
    }

    /// Consume runs until the controller side of the channel is dropped
    pub async fn run(self, mut receiver: mpsc::Receiver<BatchRun>) {
        tracing::info!(
            "Batch worker started (provider: {}, model: {}, limit: {})",
            self.provider.name(),
            self.provider.model(),
            CONCURRENCY_LIMIT
        );

        while let Some(run) = receiver.recv().await {
            let generation = run.generation;
            let total = run.pending.len();
            tracing::info!("Processing run: {} jobs (generation {})", total, generation);

            self.process_run(run).await;

            if self.controller.is_current(generation) {
                let (done, failed) = self.controller.terminal_counts();
                tracing::info!(
                    "Run finished (generation {}): {} done, {} failed of {}",
                    generation,
                    done,
                    failed,
                    total
                );
            } else {
                tracing::info!("Run for generation {} superseded before completion", generation);
            }
        }

        tracing::info!("Batch worker stopped");
    }

    /// Drive every job of one run to a terminal state with bounded parallelism
    async fn process_run(&self, run: BatchRun) {
        let queue = Arc::new(Mutex::new(VecDeque::from(run.pending)));
        let pool_size = CONCURRENCY_LIMIT.min(queue.lock().len()).max(1);

        let workers = (0..pool_size).map(|_| self.drain_queue(run.generation, Arc::clone(&queue)));
        join_all(workers).await;
    }

    /// Pop-or-exit loop for one logical worker
    async fn drain_queue(&self, generation: u64, queue: Arc<Mutex<VecDeque<Uuid>>>) {
        loop {
            if !self.controller.is_current(generation) {
                // the batch was replaced or reset; abandon the rest of the run
                return;
            }
            let next = queue.lock().pop_front();
            let Some(id) = next else {
                return;
            };
            self.run_job(generation, id).await;
        }
    }

    /// Execute a single job; any failure is absorbed into the job's state
    async fn run_job(&self, generation: u64, id: Uuid) {
        let snapshot = self.controller.snapshot();
        if snapshot.generation != generation {
            return;
        }
        let Some(operation) = snapshot.operation else {
            return;
        };
        let Some(job) = snapshot.job(id) else {
            return;
        };
        let request = TransformRequest {
            data: job.source.data.clone(),
            media_type: job.source.media_type.clone(),
            operation,
            quality: snapshot.quality,
        };
        drop(snapshot);

        if !self.controller.begin_job(generation, id) {
            // already terminal, requeued elsewhere, or the batch moved on
            return;
        }

        match self.provider.transform(request).await {
            Ok(output) => {
                tracing::debug!("Job {} transformed ({} bytes)", id, output.data.len());
                self.controller.finish_job(
                    generation,
                    id,
                    ImageBlob::new(output.data, output.media_type),
                );
            }
            Err(e) => {
                let message = failure_message(&e);
                tracing::warn!("Job {} failed: {}", id, message);
                self.controller.fail_job(generation, id, message);
            }
        }
    }
}

/// User-facing message for a transform failure
fn failure_message(err: &Error) -> String {
    match err {
        Error::Transform(msg) | Error::Config(msg) if !msg.trim().is_empty() => msg.clone(),
        _ => GENERIC_TRANSFORM_ERROR.to_string(),
    }
}
