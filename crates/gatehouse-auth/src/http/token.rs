//! Token endpoint handler.
//!
//! `POST /token` accepts a form-encoded grant request with client
//! credentials via HTTP Basic Auth or body parameters, and responds with a
//! JSON token response or an RFC 6749 error body.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::token::{TokenError, TokenErrorCode, TokenRequest};
use crate::oauth::token_service::TokenService;

/// State for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// The token service.
    pub service: Arc<TokenService>,
}

/// `POST /token`: exchanges a grant for tokens.
pub async fn token_handler(
    State(state): State<TokenState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.service.exchange(&request, authorization).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => token_error_response(&err),
    }
}

/// Maps an internal error to the RFC 6749 error body and status.
fn token_error_response(err: &AuthError) -> Response {
    let code = match err {
        AuthError::InvalidClient { .. } | AuthError::Unauthorized { .. } => {
            TokenErrorCode::InvalidClient
        }
        AuthError::InvalidGrant { .. } | AuthError::ReplayDetected { .. } | AuthError::InvalidToken => {
            TokenErrorCode::InvalidGrant
        }
        AuthError::InvalidScope { .. } | AuthError::InsufficientScope { .. } => {
            TokenErrorCode::InvalidScope
        }
        AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
        AuthError::Transient { .. } | AuthError::Internal { .. } => TokenErrorCode::ServerError,
        _ => TokenErrorCode::InvalidRequest,
    };

    // Replay details stay out of the response body; the wire format never
    // distinguishes a replay from any other dead grant.
    let description = match err {
        AuthError::ReplayDetected { .. } => "Grant is no longer valid".to_string(),
        other => other.to_string(),
    };

    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    let body = TokenError::with_description(code, description);

    let mut response = (status, Json(body)).into_response();
    if code == TokenErrorCode::InvalidClient {
        if let Ok(value) = r#"Basic realm="gatehouse""#.parse() {
            response
                .headers_mut()
                .insert(axum::http::header::WWW_AUTHENTICATE, value);
        }
    }
    response
}
