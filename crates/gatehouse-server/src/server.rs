//! Router and middleware composition.
//!
//! The request filter list is composed once at startup and immutable
//! thereafter: CORS (when origins are configured), request tracing, and the
//! subject filter guarding the authorization endpoint. The authenticated
//! subject arrives from the fronting authentication layer in a configured
//! header; identity and session transport are that layer's concern.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gatehouse_auth::AuthResult;
use gatehouse_auth::error::AuthError;
use gatehouse_auth::guard::{BearerAuth, GuardRejection, GuardState};
use gatehouse_auth::http::{
    AuthenticatedSubject, AuthorizeState, JwksState, TokenState, authorize_handler, jwks_handler,
    token_handler,
};
use gatehouse_auth::keys::KeyRing;
use gatehouse_auth::oauth::{AuthorizationService, TokenService};
use gatehouse_auth::storage::{ClientStore, GrantStore};
use gatehouse_auth::token::TokenCodec;
use gatehouse_storage_memory::{MemoryClientStore, MemoryGrantStore};

use crate::config::ServerConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authorization endpoint state.
    pub authorize: AuthorizeState,

    /// Token endpoint state.
    pub token: TokenState,

    /// JWKS endpoint state.
    pub jwks: JwksState,

    /// Bearer guard state.
    pub guard: GuardState,
}

impl axum::extract::FromRef<AppState> for AuthorizeState {
    fn from_ref(state: &AppState) -> Self {
        state.authorize.clone()
    }
}

impl axum::extract::FromRef<AppState> for TokenState {
    fn from_ref(state: &AppState) -> Self {
        state.token.clone()
    }
}

impl axum::extract::FromRef<AppState> for JwksState {
    fn from_ref(state: &AppState) -> Self {
        state.jwks.clone()
    }
}

impl axum::extract::FromRef<AppState> for GuardState {
    fn from_ref(state: &AppState) -> Self {
        state.guard.clone()
    }
}

/// The wired application components.
///
/// The stores and key ring are exposed alongside the router state so the
/// binary can seed clients and drive the background jobs.
pub struct AppComponents {
    /// Router state.
    pub state: AppState,

    /// Signing key ring (for the rotation job).
    pub key_ring: Arc<KeyRing>,

    /// Client registry (for seeding).
    pub clients: Arc<MemoryClientStore>,

    /// Grant store (for the cleanup job).
    pub grants: Arc<MemoryGrantStore>,
}

/// Builds the application components from configuration.
///
/// # Errors
/// Returns an error if signing key generation fails.
pub fn build_state(config: &ServerConfig) -> AuthResult<AppComponents> {
    let key_ring = Arc::new(
        KeyRing::generate(config.auth.signing.algorithm)
            .map_err(|e| AuthError::internal(format!("Failed to generate signing key: {e}")))?,
    );

    let codec = Arc::new(TokenCodec::new(
        key_ring.clone(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
    ));

    let clients = Arc::new(MemoryClientStore::new());
    let grants = Arc::new(MemoryGrantStore::new());
    let clients_dyn: Arc<dyn ClientStore> = clients.clone();
    let grants_dyn: Arc<dyn GrantStore> = grants.clone();

    let state = AppState {
        authorize: AuthorizeState {
            service: Arc::new(AuthorizationService::new(
                clients_dyn.clone(),
                grants_dyn.clone(),
                config.auth.clone(),
            )),
        },
        token: TokenState {
            service: Arc::new(TokenService::new(
                codec.clone(),
                clients_dyn,
                grants_dyn,
                config.auth.clone(),
            )),
        },
        jwks: JwksState {
            key_ring: key_ring.clone(),
        },
        guard: GuardState::new(codec),
    };

    Ok(AppComponents {
        state,
        key_ring,
        clients,
        grants,
    })
}

/// Builds the router with the startup-immutable filter list applied.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let subject_header = config.subject_header.clone();

    let authorize_routes = Router::new()
        .route("/authorize", get(authorize_handler))
        .route_layer(middleware::from_fn(move |request: Request, next: Next| {
            let header = subject_header.clone();
            subject_filter(header, request, next)
        }));

    let mut router = Router::new()
        .merge(authorize_routes)
        .route("/token", post(token_handler))
        .route("/.well-known/jwks.json", get(jwks_handler))
        .route("/userinfo", get(userinfo_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&config.cors_allowed_origins) {
        router = router.layer(cors);
    }

    router
}

/// Maps the trusted subject header into the request extension the
/// authorization handler consumes. Requests without it never reach the
/// endpoint.
async fn subject_filter(header: String, mut request: Request, next: Next) -> Response {
    let subject = request
        .headers()
        .get(&header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let Some(subject) = subject else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
            .into_response();
    };

    request
        .extensions_mut()
        .insert(AuthenticatedSubject(subject));
    next.run(request).await
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

/// `GET /userinfo`: subject claims for a valid bearer token.
async fn userinfo_handler(
    BearerAuth(ctx): BearerAuth,
) -> Result<Json<serde_json::Value>, GuardRejection> {
    ctx.require_scopes(&["openid"])?;

    Ok(Json(json!({
        "sub": ctx.subject(),
        "client_id": ctx.client_id(),
        "scope": ctx.scope(),
    })))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_and_router() {
        let config = ServerConfig::default();
        let components = build_state(&config).unwrap();
        let _router = build_router(components.state, &config);
    }

    #[test]
    fn test_cors_layer_disabled_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["https://localhost:4200".to_string()]).is_some());
    }
}
