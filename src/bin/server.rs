//! Batch retouch server binary
//!
//! Run with: cargo run --bin batch-retouch-server

use batch_retouch::config::RetouchConfig;
use batch_retouch::processing::{CONCURRENCY_LIMIT, MAX_BATCH_SIZE};
use batch_retouch::server::RetouchServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batch_retouch=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      Batch Retouch                        ║
║        Watermark & Background Removal for Images          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config = RetouchConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Image model: {}", config.gemini.model);
    tracing::info!("  - API base URL: {}", config.gemini.base_url);
    tracing::info!("  - Max upload size: {} bytes", config.server.max_upload_size);
    tracing::info!("  - Max batch size: {} images", MAX_BATCH_SIZE);
    tracing::info!("  - Concurrency limit: {} transforms", CONCURRENCY_LIMIT);

    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY environment variable not set");
        tracing::warn!(
            "The server will start, but every transform will fail until a key is provided"
        );
    }

    // Create and start server
    let server = RetouchServer::new(config);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/batch            - Upload images");
    println!("  GET    /api/batch            - Batch state and progress");
    println!("  DELETE /api/batch            - Discard the batch");
    println!("  GET    /api/export/archive   - Download selected results");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
