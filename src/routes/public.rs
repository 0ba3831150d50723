use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that must work for callers without a session. The auth API
/// routes here are on the gate's public-API allow-list and bypass session
/// resolution entirely; `/` and `/health` pass as public/open paths.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The landing page. Signed-in callers never reach it: the gate
        // redirects them to their role's home area first.
        .route("/", get(|| async { "Fitness Portal" }))
        // POST /api/auth/login
        // Credential exchange against the external auth provider; sets the
        // session cookie on success.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/auth/invite/{token}
        // Pending-invitation lookup used by the activation page to prefill.
        .route("/api/auth/invite/{token}", get(handlers::get_invitation))
        // POST /api/auth/activate
        // Invitation acceptance: provider signup + local profile mirror.
        .route("/api/auth/activate", post(handlers::activate_account))
        // POST /api/auth/reset-password
        // Initiates the provider-managed recovery flow. Always 202.
        .route(
            "/api/auth/reset-password",
            post(handlers::request_password_reset),
        )
}
