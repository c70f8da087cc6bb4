//! API routes

pub mod auth;
pub mod health;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::{require_admin, require_auth},
    security::security_headers_middleware,
    state::AppState,
};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/oauth/login", get(auth::oauth_login))
        .route("/auth/oauth/verify", post(auth::oauth_verify));

    // Protected routes (valid session cookie required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/token/verify-refresh", post(auth::verify_refresh))
        .route("/api/new", post(users::complete_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes: require_auth runs first, then the role check
    let admin_routes = Router::new()
        .route("/api/list_users", get(users::list_users))
        .route("/api/update_role", post(users::update_role))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let mut router = Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(state.config.frontend_origin.as_deref()) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// Credentialed CORS for the single configured frontend origin.
/// Credentials rule out a wildcard origin, so nothing is allowed when unset.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(origin = %origin, "Ignoring invalid FRONTEND_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
    )
}
