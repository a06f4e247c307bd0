//! Video metadata CRUD handlers.
//!
//! Records are created as drafts with no video or thumbnail URL; the upload
//! handlers fill those in later.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::db::{self, Video};

use super::pipeline::UploadError;

// ============================================================================
// Request Types
// ============================================================================

/// Request to create a video record.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVideoRequest {
    /// Title, 1 to 256 characters.
    #[validate(length(min = 1, max = 256, message = "Title must be 1-256 characters"))]
    pub title: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a draft video record owned by the caller.
///
/// POST /api/videos
#[utoipa::path(
    post,
    path = "/api/videos",
    tag = "videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video record created", body = Video),
        (status = 400, description = "Invalid title"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.id))]
pub async fn create_video(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<Video>), UploadError> {
    payload
        .validate()
        .map_err(|e| UploadError::Validation(e.to_string()))?;

    let video =
        db::create_video(&state.db, auth_user.id, &payload.title, &payload.description).await?;

    tracing::info!(video_id = %video.id, "Video record created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// List the caller's video records, newest first.
///
/// GET /api/videos
#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    responses(
        (status = 200, description = "The caller's videos", body = [Video]),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth_user), fields(user_id = %auth_user.id))]
pub async fn list_videos(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Video>>, UploadError> {
    let videos = db::list_videos_by_user(&state.db, auth_user.id).await?;
    Ok(Json(videos))
}

/// Fetch a single video record by ID.
///
/// GET /api/videos/{id}
///
/// Draft metadata is visible to any authenticated caller; only uploads are
/// ownership-gated.
#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(
        ("id" = Uuid, Path, description = "Video record ID"),
    ),
    responses(
        (status = 200, description = "The video record", body = Video),
        (status = 404, description = "Video not found"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state))]
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<Video>, UploadError> {
    let video = db::find_video_by_id(&state.db, video_id)
        .await?
        .ok_or(UploadError::NotFound)?;
    Ok(Json(video))
}

/// Delete a video record.
///
/// DELETE /api/videos/{id}
#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    tag = "videos",
    params(
        ("id" = Uuid, Path, description = "Video record ID"),
    ),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 403, description = "Not the owner of this video"),
        (status = 404, description = "Video not found"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth_user), fields(user_id = %auth_user.id))]
pub async fn delete_video(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<StatusCode, UploadError> {
    let video = db::find_video_by_id(&state.db, video_id)
        .await?
        .ok_or(UploadError::NotFound)?;
    if video.user_id != auth_user.id {
        return Err(UploadError::Forbidden);
    }

    db::delete_video(&state.db, video_id).await?;

    tracing::info!(video_id = %video_id, "Video record deleted");
    Ok(StatusCode::NO_CONTENT)
}
