//! Batch processing: copy-on-write batch state, controller, and worker pool

mod controller;
mod state;
mod worker;

pub use controller::{BatchController, BatchRun, JobInput};
pub use state::{BatchState, MAX_BATCH_SIZE};
pub use worker::{BatchWorker, CONCURRENCY_LIMIT, GENERIC_TRANSFORM_ERROR};
