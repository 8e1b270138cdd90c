//! Application state for the batch retouch server

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::RetouchConfig;
use crate::processing::{BatchController, BatchWorker};
use crate::providers::{GeminiImageEditor, TransformProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RetouchConfig,
    /// Batch controller: snapshot holder and run dispatcher
    controller: Arc<BatchController>,
    /// Remote transform provider
    provider: Arc<dyn TransformProvider>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the Gemini provider and start the
    /// background batch worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: RetouchConfig) -> Self {
        if config.gemini.api_key.is_none() {
            tracing::warn!(
                "GEMINI_API_KEY not set; transforms will fail until a key is provided"
            );
        }
        let provider: Arc<dyn TransformProvider> = Arc::new(GeminiImageEditor::new(&config.gemini));
        Self::with_provider(config, provider)
    }

    /// Create application state with a custom transform provider
    pub fn with_provider(config: RetouchConfig, provider: Arc<dyn TransformProvider>) -> Self {
        let (controller, receiver) = BatchController::new();
        let controller = Arc::new(controller);

        let worker = BatchWorker::new(Arc::clone(&controller), Arc::clone(&provider));
        tokio::spawn(async move {
            worker.run(receiver).await;
        });

        tracing::info!(
            "Application state initialized (provider: {}, model: {})",
            provider.name(),
            provider.model()
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                controller,
                provider,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RetouchConfig {
        &self.inner.config
    }

    /// Get the batch controller
    pub fn controller(&self) -> &Arc<BatchController> {
        &self.inner.controller
    }

    /// Get the transform provider
    pub fn provider(&self) -> &Arc<dyn TransformProvider> {
        &self.inner.provider
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
