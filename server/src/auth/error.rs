//! Authentication errors and their HTTP mappings.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Everything the auth surface can answer with.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password. Deliberately covers both so login
    /// responses cannot be used to enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The token's subject no longer maps to a user row.
    #[error("User not found")]
    UserNotFound,

    /// Registration hit an email that is already taken.
    #[error("Email already taken")]
    UserAlreadyExists,

    /// Token failed signature or structural validation.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token was valid once but its expiry has passed.
    #[error("Token expired")]
    TokenExpired,

    /// No `Authorization` header on a protected route.
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// `Authorization` header present but not `Bearer <token>`.
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Request body failed field validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Argon2 hashing or hash parsing failed.
    #[error("Password processing failed")]
    PasswordHash,

    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Token generation failed.
    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// JSON error body: machine-readable `error` code plus a human message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AuthError {
    /// HTTP status and stable error code for this variant.
    const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            Self::UserAlreadyExists => (StatusCode::CONFLICT, "USER_EXISTS"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "MISSING_AUTH"),
            Self::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::PasswordHash | Self::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            Self::Jwt(_) => (StatusCode::UNAUTHORIZED, "TOKEN_ERROR"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
