//! Core types for the batch retouch service

pub mod job;

pub use job::{
    is_supported_media_type, BatchProgress, ImageBlob, ImageJob, JobStatus, Operation, Quality,
};
