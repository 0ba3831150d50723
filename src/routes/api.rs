use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated API Router Module
///
/// Every route here sits behind the access gate: the caller holds a resolved
/// session, and the rule table has already granted the minimum role for the
/// path and method. Handlers still perform their own ownership and role
/// checks, so no single layer is load-bearing alone.
pub fn api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/me
        // The caller's own profile. No rule-table entry: any session passes.
        .route("/api/me", get(handlers::get_me))
        // --- User Administration ---
        // GET /api/users?role=...     (trainer or higher)
        // POST /api/users             (admin: create invitation, send email)
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::invite_user),
        )
        // PUT /api/users/{id}/role    (admin)
        .route("/api/users/{id}/role", put(handlers::update_user_role))
        // DELETE /api/users/{id}      (admin)
        .route("/api/users/{id}", delete(handlers::delete_user))
        // --- Training Plans ---
        // GET lists role-aware; POST creates with the caller as author.
        .route(
            "/api/plans",
            get(handlers::list_plans).post(handlers::create_plan),
        )
        // Detail, owner-only update, two-tier delete.
        .route(
            "/api/plans/{id}",
            get(handlers::get_plan)
                .put(handlers::update_plan)
                .delete(handlers::delete_plan),
        )
        // POST /api/plans/{id}/assign
        // Hands the plan to a client; idempotent on the composite key and
        // notifies the client by email.
        .route("/api/plans/{id}/assign", post(handlers::assign_plan))
        // --- Exercises ---
        .route(
            "/api/plans/{id}/exercises",
            get(handlers::list_exercises).post(handlers::add_exercise),
        )
        .route(
            "/api/exercises/{id}",
            put(handlers::update_exercise).delete(handlers::delete_exercise),
        )
}
