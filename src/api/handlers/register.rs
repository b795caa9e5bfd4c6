use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use super::{Credentials, TokenResponse, auth_error_response, error_response};
use crate::auth::AuthService;

/// `POST /register`: create an account and return its first token.
#[instrument(skip_all)]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<Credentials>>,
) -> Response {
    let Some(Json(credentials)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    match service
        .register(&credentials.email, &credentials.password)
        .await
    {
        Ok(token) => (StatusCode::OK, Json(TokenResponse { token })).into_response(),
        Err(err) => auth_error_response(&err),
    }
}
