//! Thumbnail upload handler.
//!
//! Thumbnails never touch the video pipeline: they are small images, written
//! straight into the local assets directory and served back as static files.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use mime_guess::mime::Mime;
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::db::{self, Video};

use super::keys;
use super::pipeline::UploadError;

/// Content types accepted for thumbnails.
const ALLOWED_THUMBNAIL_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Validate thumbnail content against its claimed MIME type using magic
/// byte detection.
fn validate_thumbnail_content(data: &[u8], claimed: &str) -> Result<(), UploadError> {
    let Some(kind) = infer::get(data) else {
        tracing::warn!(
            claimed_mime = %claimed,
            size = data.len(),
            "Thumbnail content does not match any known magic byte signature"
        );
        return Err(UploadError::ContentMismatch {
            declared: claimed.to_string(),
        });
    };

    if kind.mime_type() != claimed {
        tracing::warn!(
            claimed_mime = %claimed,
            detected_mime = %kind.mime_type(),
            "Thumbnail content type mismatch"
        );
        return Err(UploadError::ContentMismatch {
            declared: claimed.to_string(),
        });
    }

    Ok(())
}

/// Upload a thumbnail image for an existing video record.
///
/// POST /api/videos/{id}/thumbnail
///
/// Expects multipart form with:
/// - `thumbnail`: PNG or JPEG image data
///
/// The image is stored under the assets directory and the record's
/// `thumbnail_url` points at the locally served copy.
#[utoipa::path(
    post,
    path = "/api/videos/{id}/thumbnail",
    tag = "videos",
    params(
        ("id" = Uuid, Path, description = "Video record ID"),
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail stored", body = Video),
        (status = 400, description = "Missing thumbnail field or unsupported content type"),
        (status = 403, description = "Not the owner of this video"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Image exceeds the thumbnail size limit"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth_user, multipart), fields(user_id = %auth_user.id))]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Video>, UploadError> {
    // Ownership gate before any byte of the payload is read
    let video = db::find_video_by_id(&state.db, video_id)
        .await?
        .ok_or(UploadError::NotFound)?;
    if video.user_id != auth_user.id {
        return Err(UploadError::Forbidden);
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Validation(e.to_string()))?
    {
        if field.name() != Some("thumbnail") {
            // Ignore unknown fields
            continue;
        }

        let declared = field.content_type().unwrap_or_default().to_string();
        let mime: Mime = declared.parse().map_err(|_| UploadError::InvalidMimeType {
            mime_type: declared.clone(),
        })?;
        if !ALLOWED_THUMBNAIL_TYPES.contains(&mime.essence_str()) {
            return Err(UploadError::InvalidMimeType { mime_type: declared });
        }

        // Thumbnails are small enough to buffer
        let data = field
            .bytes()
            .await
            .map_err(|e| UploadError::Validation(e.to_string()))?;

        if data.len() as u64 > state.config.max_thumbnail_size {
            return Err(UploadError::TooLarge {
                max_bytes: state.config.max_thumbnail_size,
            });
        }

        validate_thumbnail_content(&data, mime.essence_str())?;

        let name = keys::random_asset_name(&mime);
        let dest = state.config.assets_root.join(&name);
        tokio::fs::write(&dest, &data)
            .await
            .map_err(UploadError::AssetWrite)?;

        let url = format!("http://localhost:{}/assets/{name}", state.config.port());
        let video = db::update_thumbnail_url(&state.db, video_id, &url)
            .await
            .map_err(UploadError::Persist)?;

        tracing::info!(video_id = %video_id, asset = %name, "Thumbnail stored");
        return Ok(Json(video));
    }

    Err(UploadError::NoFile)
}
