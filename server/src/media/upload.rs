//! Video upload handler.
//!
//! Thin HTTP face over [`VideoPipeline`](super::pipeline::VideoPipeline):
//! pulls the `video` field out of the multipart form and hands its byte
//! stream to the pipeline without buffering it in memory.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::db::Video;

use super::pipeline::{UploadError, UploadRequest};

/// Upload a video file for an existing video record.
///
/// POST /api/videos/{id}/upload
///
/// Expects multipart form with:
/// - `video`: The MP4 file data
///
/// On success the file has been remuxed for fast-start playback, uploaded
/// to the object store, and the record's `video_url` points at it.
#[utoipa::path(
    post,
    path = "/api/videos/{id}/upload",
    tag = "videos",
    params(
        ("id" = Uuid, Path, description = "Video record ID"),
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video published", body = Video),
        (status = 400, description = "Missing video field or unsupported content type"),
        (status = 403, description = "Not the owner of this video"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "File exceeds the upload size limit"),
        (status = 422, description = "File could not be probed or remuxed"),
        (status = 503, description = "Video storage is not configured"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth_user, multipart), fields(user_id = %auth_user.id))]
pub async fn upload_video(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Video>, UploadError> {
    // Check the object store is configured
    let pipeline = state.pipeline.as_ref().ok_or(UploadError::NotConfigured)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Validation(e.to_string()))?
    {
        if field.name() != Some("video") {
            // Ignore unknown fields
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();

        // The field itself is the payload stream; the pipeline stages it
        // to disk under the size cap instead of buffering it here.
        let video = pipeline
            .run(
                &state.db,
                UploadRequest {
                    video_id,
                    owner_id: auth_user.id,
                    content_type,
                    payload: field,
                },
            )
            .await?;

        return Ok(Json(video));
    }

    Err(UploadError::NoFile)
}
