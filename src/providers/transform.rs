//! Transform provider trait for the remote image editing service

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::{Operation, Quality};

/// One image handed to the remote service for editing
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Encoded source image
    pub data: Bytes,
    /// Declared media type of `data`
    pub media_type: String,
    /// Operation to apply
    pub operation: Operation,
    /// Quality level; only watermark removal reads it
    pub quality: Quality,
}

/// The edited image the service returned
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub data: Bytes,
    pub media_type: String,
}

/// Trait for remote generative image editing
///
/// Implementations:
/// - `GeminiImageEditor`: Gemini image model via the developer API
///
/// Outcomes are always a tagged `Result`; transport problems, API errors and
/// missing-image responses all surface as `Error::Transform` with a
/// user-facing message.
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Apply the requested operation to one image
    async fn transform(&self, request: TransformRequest) -> Result<TransformOutput>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
