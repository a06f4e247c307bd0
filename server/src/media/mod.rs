//! Media Service
//!
//! Video metadata records, the upload/ingestion pipeline, and thumbnails.

mod aspect;
mod keys;
pub mod pipeline;
pub mod probe;
pub mod remux;
pub mod s3;
mod staging;
pub mod store;
pub(crate) mod thumbnails;
pub(crate) mod upload;
pub(crate) mod videos;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::AppState;
use crate::config::Config;

pub use pipeline::{PipelineConfig, UploadError, VideoPipeline};
pub use s3::S3ObjectStore;

/// Create videos router (protected routes).
///
/// The upload routes carry their own body limits sized from config; the
/// metadata routes keep the small default.
pub fn videos_router(config: &Config) -> Router<AppState> {
    Router::new()
        .route("/", get(videos::list_videos).post(videos::create_video))
        .route("/{id}", get(videos::get_video).delete(videos::delete_video))
        .route(
            "/{id}/upload",
            post(upload::upload_video).layer(DefaultBodyLimit::max(config.video_body_limit())),
        )
        .route(
            "/{id}/thumbnail",
            post(thumbnails::upload_thumbnail)
                .layer(DefaultBodyLimit::max(config.thumbnail_body_limit())),
        )
}
