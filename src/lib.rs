//! batch-retouch: batch image retouching via a generative image model
//!
//! Upload a batch of images, pick an operation (watermark removal or
//! background removal), and the service drives every image through the
//! remote image model with bounded concurrency. Completed results can be
//! selected and exported individually or as a zip archive, re-encoded to
//! PNG, JPEG, or WebP.
//!
//! The core is the in-memory batch controller: copy-on-write snapshots of
//! the job collection, a fixed-size logical worker pool, per-job failure
//! isolation, and a generation tag that keeps completions of a discarded
//! batch from resurfacing.

pub mod config;
pub mod error;
pub mod export;
pub mod processing;
pub mod providers;
pub mod selection;
pub mod server;
pub mod types;

pub use config::RetouchConfig;
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use processing::{BatchController, BatchState};
pub use types::{BatchProgress, ImageBlob, ImageJob, JobStatus, Operation, Quality};
