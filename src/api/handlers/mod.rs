//! Request handlers and shared wire types.

pub(crate) mod health;
pub(crate) mod login;
pub(crate) mod register;
pub(crate) mod revoke;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;

/// Request body shared by register and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Successful register/login response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Map a core error to its wire response.
///
/// Authentication failures stay deliberately generic: unknown identifier,
/// wrong secret, and any token failure all read the same to a client.
pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::BadInput => {
            error_response(StatusCode::BAD_REQUEST, "Email and password required")
        }
        AuthError::AlreadyExists => {
            error_response(StatusCode::BAD_REQUEST, "Account already exists")
        }
        AuthError::InvalidCredentials => {
            error_response(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }
        AuthError::InvalidToken | AuthError::ExpiredToken => {
            error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
        }
        AuthError::Hashing(_) | AuthError::CorruptHash(_) | AuthError::Signing(_) => {
            error!("internal auth failure: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// JSON fallback for unknown routes.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}
