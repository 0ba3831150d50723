use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Area Router Module
///
/// The role-scoped landing areas. The gate applies the exact-match policy to
/// these prefixes: a caller whose role is not precisely the area's role is
/// redirected to `/` before any handler runs. Handlers re-check the role all
/// the same.
pub fn area_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Aggregate counters: users by role, plans, pending invitations.
        .route("/admin", get(handlers::admin_dashboard))
        // GET /trainer
        // The trainer's own plan, client and exercise counters.
        .route("/trainer", get(handlers::trainer_dashboard))
        // GET /client
        // The client's assigned plans.
        .route("/client", get(handlers::client_dashboard))
}
