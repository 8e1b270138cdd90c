//! Provider abstraction for the remote image transform service
//!
//! The batch worker only sees the `TransformProvider` trait, so tests can
//! script outcomes without a network.

pub mod gemini;
pub mod transform;

pub use gemini::GeminiImageEditor;
pub use transform::{TransformOutput, TransformProvider, TransformRequest};
