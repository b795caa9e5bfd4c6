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

/// `POST /login`: authenticate an attempt and return a fresh token.
#[instrument(skip_all)]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<Credentials>>,
) -> Response {
    let Some(Json(credentials)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    match service
        .login(&credentials.email, &credentials.password)
        .await
    {
        Ok(token) => (StatusCode::OK, Json(TokenResponse { token })).into_response(),
        Err(err) => auth_error_response(&err),
    }
}
