//! Authorization endpoint handler.
//!
//! `GET /authorize` drives the authorization-code grant. The resource owner
//! is authenticated upstream (session transport is infrastructure, not this
//! crate's concern); the authenticated subject arrives as a request
//! extension inserted by that upstream layer.
//!
//! # Error reporting
//!
//! Failures that occur before the redirect URI has been validated (unknown
//! client, unregistered redirect URI) are rendered as a direct response.
//! Everything after that point is reported by redirecting back to the
//! client with `error` and `state` query parameters.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationRequest, AuthorizationResponse, AuthorizeError, AuthorizeErrorCode,
};
use crate::oauth::service::AuthorizationService;

/// State for the authorization endpoint.
#[derive(Clone)]
pub struct AuthorizeState {
    /// The authorization service.
    pub service: Arc<AuthorizationService>,
}

/// The authenticated resource owner, inserted by upstream middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject(pub String);

/// `GET /authorize`: issues an authorization code.
pub async fn authorize_handler(
    State(state): State<AuthorizeState>,
    Extension(subject): Extension<AuthenticatedSubject>,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    match state.service.authorize(&request, &subject.0).await {
        Ok(code) => {
            let response = AuthorizationResponse::new(code.code, request.state.clone());
            match response.to_redirect_url(&request.redirect_uri) {
                Ok(url) => Redirect::to(&url).into_response(),
                Err(_) => render_error(&AuthError::invalid_redirect_uri("Malformed redirect URI")),
            }
        }
        Err(err) => error_response(&request, err),
    }
}

/// Routes an error either to a rendered response or a redirect.
fn error_response(request: &AuthorizationRequest, err: AuthError) -> Response {
    match &err {
        // The client or its redirect URI could not be trusted: render.
        AuthError::InvalidClient { .. } | AuthError::InvalidRedirectUri { .. } => {
            render_error(&err)
        }
        // Redirect URI is validated from here on: report via redirect.
        _ => {
            let code = redirect_error_code(&err);
            let error =
                AuthorizeError::with_description(code, err.to_string(), request.state.clone());
            match error.to_redirect_url(&request.redirect_uri) {
                Ok(url) => Redirect::to(&url).into_response(),
                Err(_) => render_error(&err),
            }
        }
    }
}

fn redirect_error_code(err: &AuthError) -> AuthorizeErrorCode {
    match err {
        AuthError::InvalidScope { .. } => AuthorizeErrorCode::InvalidScope,
        AuthError::UnsupportedResponseType { .. } => AuthorizeErrorCode::UnsupportedResponseType,
        AuthError::Transient { .. } => AuthorizeErrorCode::TemporarilyUnavailable,
        AuthError::Internal { .. } => AuthorizeErrorCode::ServerError,
        _ => AuthorizeErrorCode::InvalidRequest,
    }
}

fn render_error(err: &AuthError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "error": err.oauth_error_code(),
            "error_description": err.to_string(),
        })),
    )
        .into_response()
}
