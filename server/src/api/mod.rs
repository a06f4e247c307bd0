//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    extract::State, middleware::from_fn_with_state, routing::get, Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{auth, config::Config, media, media::VideoPipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Video ingestion pipeline (absent when the object store is unavailable)
    pub pipeline: Option<Arc<VideoPipeline>>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: SqlitePool, config: Config, pipeline: Option<VideoPipeline>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            pipeline: pipeline.map(Arc::new),
        }
    }

    /// Check if video uploads are configured and available.
    #[must_use]
    pub const fn has_uploads(&self) -> bool {
        self.pipeline.is_some()
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protected routes that require authentication
    let protected_routes = Router::new()
        .nest("/api/videos", media::videos_router(&state.config))
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes (pass state for middleware)
        .nest("/api/auth", auth::router(state.clone()))
        // Protected video routes
        .merge(protected_routes)
        // Locally served assets (thumbnails)
        .nest_service("/assets", ServeDir::new(&state.config.assets_root))
        // API documentation
        .route("/api/docs/openapi.json", get(openapi_spec))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether video uploads are configured
    uploads: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uploads: state.has_uploads(),
    })
}

/// OpenAPI documentation for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,
        crate::media::videos::create_video,
        crate::media::videos::list_videos,
        crate::media::videos::get_video,
        crate::media::videos::delete_video,
        crate::media::upload::upload_video,
        crate::media::thumbnails::upload_thumbnail,
    ),
    components(schemas(
        crate::auth::AuthResponse,
        crate::auth::UserResponse,
        crate::db::Video,
        crate::media::videos::CreateVideoRequest,
    )),
    tags(
        (name = "auth", description = "Registration, login, and profiles"),
        (name = "videos", description = "Video records, uploads, and thumbnails"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

/// Registers the bearer token scheme referenced by the path annotations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the generated OpenAPI document.
async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
