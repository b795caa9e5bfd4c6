use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use super::{auth_error_response, error_response};
use crate::auth::AuthService;

/// `DELETE /delete`: verify the bearer token and delete its account.
#[instrument(skip_all)]
pub async fn revoke(headers: HeaderMap, service: Extension<Arc<AuthService>>) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    match service.revoke(&token) {
        Ok(_) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => auth_error_response(&err),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, Response> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header",
        ));
    };
    let malformed = || {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Malformed Authorization header",
        )
    };
    let value = value.to_str().map_err(|_| malformed())?;
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(malformed)?;
    if token.is_empty() {
        return Err(malformed());
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::extract_bearer_token;
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    #[test]
    fn bearer_token_extracted_and_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc.def.ghi "));
        assert_eq!(
            extract_bearer_token(&headers).ok(),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn missing_and_malformed_headers_are_rejected() {
        let headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
