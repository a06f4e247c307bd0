//! Reelvault Server - Main Entry Point
//!
//! Self-hosted video upload and streaming-readiness backend.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use rv_server::media::probe::FfprobeProber;
use rv_server::media::remux::FfmpegRemuxer;
use rv_server::{api, config, db, media};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rv_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Reelvault Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Local directories must exist before anything writes into them
    tokio::fs::create_dir_all(&config.assets_root).await?;
    tokio::fs::create_dir_all(&config.staging_dir).await?;

    // Initialize the object store and pipeline (optional - video uploads
    // are disabled if the bucket is unreachable)
    let store = media::S3ObjectStore::new(&config);
    let pipeline = match store.health_check().await {
        Ok(()) => {
            info!(bucket = %config.s3_bucket, "S3 storage connected");
            Some(media::VideoPipeline::new(
                Arc::new(FfprobeProber::new(config.ffprobe_path.clone())),
                Arc::new(FfmpegRemuxer::new(config.ffmpeg_path.clone())),
                Arc::new(store),
                media::PipelineConfig {
                    staging_dir: config.staging_dir.clone(),
                    max_upload_bytes: config.max_video_upload_size,
                },
            ))
        }
        Err(e) => {
            tracing::warn!("S3 health check failed: {}. Video uploads disabled.", e);
            None
        }
    };

    // Build application state
    let state = api::AppState::new(db_pool, config.clone(), pipeline);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
