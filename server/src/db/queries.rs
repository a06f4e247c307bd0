//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! `SQLite` has no server-side UUID or timestamp generation, so ids and
//! timestamps are assigned here before binding.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;
use uuid::Uuid;

use super::models::{User, Video};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID.
pub async fn find_user_by_id(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find user by email.
pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_email", email = %email))
}

/// Check if email exists.
pub async fn email_exists(pool: &SqlitePool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Create a new user.
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> sqlx::Result<User> {
    let now = Utc::now();
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (id, created_at, updated_at, email, password_hash)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(now)
    .bind(now)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

// ============================================================================
// Video Queries
// ============================================================================

/// Create a new video record with no media attached yet.
pub async fn create_video(
    pool: &SqlitePool,
    user_id: Uuid,
    title: &str,
    description: &str,
) -> sqlx::Result<Video> {
    let now = Utc::now();
    sqlx::query_as::<_, Video>(
        r"
        INSERT INTO videos (id, created_at, updated_at, title, description, user_id)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(now)
    .bind(now)
    .bind(title)
    .bind(description)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_video", user_id = %user_id))
}

/// Find video by ID.
pub async fn find_video_by_id(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Video>> {
    sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_video_by_id", video_id = %id))
}

/// List a user's videos, newest first.
pub async fn list_videos_by_user(pool: &SqlitePool, user_id: Uuid) -> sqlx::Result<Vec<Video>> {
    sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_videos_by_user", user_id = %user_id))
}

/// Set a video's published media URL.
pub async fn update_video_url(
    pool: &SqlitePool,
    video_id: Uuid,
    video_url: &str,
) -> sqlx::Result<Video> {
    sqlx::query_as::<_, Video>(
        "UPDATE videos SET video_url = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(video_url)
    .bind(Utc::now())
    .bind(video_id)
    .fetch_one(pool)
    .await
    .map_err(db_error!("update_video_url", video_id = %video_id))
}

/// Set a video's thumbnail URL.
pub async fn update_thumbnail_url(
    pool: &SqlitePool,
    video_id: Uuid,
    thumbnail_url: &str,
) -> sqlx::Result<Video> {
    sqlx::query_as::<_, Video>(
        "UPDATE videos SET thumbnail_url = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(thumbnail_url)
    .bind(Utc::now())
    .bind(video_id)
    .fetch_one(pool)
    .await
    .map_err(db_error!("update_thumbnail_url", video_id = %video_id))
}

/// Delete a video record.
pub async fn delete_video(pool: &SqlitePool, video_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(video_id)
        .execute(pool)
        .await
        .map_err(db_error!("delete_video", video_id = %video_id))?;

    Ok(())
}
