//! Job records and batch progress types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Media types the upload endpoint accepts
pub const SUPPORTED_MEDIA_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Check whether an uploaded media type is one we can process
pub fn is_supported_media_type(media_type: &str) -> bool {
    SUPPORTED_MEDIA_TYPES.contains(&media_type)
}

/// Job status
///
/// `queued -> processing -> {done | error}`; the terminal states are final
/// for a job unless it is explicitly re-enqueued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    /// Terminal states count toward progress and accept no further
    /// scheduler transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// Retouch operation applied to a whole batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Remove watermarks, logos, and text overlays
    WatermarkRemoval,
    /// Cut out the subject and make the background transparent
    BackgroundRemoval,
}

impl Operation {
    /// Get display name for logs and the info endpoint
    pub fn display_name(&self) -> &'static str {
        match self {
            Operation::WatermarkRemoval => "watermark removal",
            Operation::BackgroundRemoval => "background removal",
        }
    }
}

/// Quality level for watermark removal
///
/// Background removal ignores this; the original always requests a
/// transparent lossless cutout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

/// An encoded image plus its declared media type
///
/// `Bytes` keeps snapshot clones cheap: copying a batch copies refcounts,
/// not pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub data: Bytes,
    pub media_type: String,
}

impl ImageBlob {
    pub fn new(data: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One uploaded image's processing unit
///
/// Invariants (enforced by the batch state transitions):
/// - `output` is `Some` iff `status` is `Done`
/// - `error` is `Some` iff `status` is `Error`
#[derive(Debug, Clone)]
pub struct ImageJob {
    /// Unique job id, generated at enqueue time
    pub id: Uuid,
    /// Original upload filename (drives export naming)
    pub filename: String,
    /// Immutable original binary
    pub source: ImageBlob,
    /// Transformed binary, present once done
    pub output: Option<ImageBlob>,
    /// Current status
    pub status: JobStatus,
    /// Failure message, present only when status is Error
    pub error: Option<String>,
}

impl ImageJob {
    /// Create a queued job for an uploaded image
    pub fn new(filename: String, source: ImageBlob) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            source,
            output: None,
            status: JobStatus::Queued,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Done
    }
}

/// Aggregate batch progress: jobs in a terminal state out of the total
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent_complete(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f32 / self.total as f32 * 100.0
    }

    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
