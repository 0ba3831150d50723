use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod access;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod repository;

// Routing surface, segregated by access tier.
pub mod routes;
use routes::{api, areas, public};

// --- Public Re-exports ---

// Core state types for the application entry point (main.rs) and tests.
pub use access::AccessPolicy;
pub use config::AppConfig;
pub use mailer::{HttpMailer, MailerState, MockMailer};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application, aggregating
/// every handler decorated with `#[utoipa::path]` and the schemas used in
/// request/response bodies. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::get_invitation, handlers::activate_account,
        handlers::request_password_reset, handlers::get_me, handlers::list_users,
        handlers::invite_user, handlers::update_user_role, handlers::delete_user,
        handlers::list_plans, handlers::create_plan, handlers::get_plan,
        handlers::update_plan, handlers::delete_plan, handlers::assign_plan,
        handlers::list_exercises, handlers::add_exercise, handlers::update_exercise,
        handlers::delete_exercise, handlers::admin_dashboard, handlers::trainer_dashboard,
        handlers::client_dashboard
    ),
    components(
        schemas(
            models::Role, models::User, models::TrainingPlan, models::Exercise,
            models::PlanAssignment, models::Invitation, models::LoginRequest,
            models::ActivateAccountRequest, models::PasswordResetRequest,
            models::InviteUserRequest, models::UpdateUserRoleRequest,
            models::CreatePlanRequest, models::UpdatePlanRequest,
            models::AssignPlanRequest, models::CreateExerciseRequest,
            models::UpdateExerciseRequest, models::UserProfile,
            models::AdminDashboardStats, models::TrainerDashboardStats,
            models::ClientDashboard,
        )
    ),
    tags(
        (name = "fitness-portal", description = "Fitness Training Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across every request.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: database access behind the trait object.
    pub repo: RepositoryState,
    /// Mail layer: transactional email behind the trait object.
    pub mailer: MailerState,
    /// The access-control policy, built once at startup and injected here.
    pub policy: Arc<AccessPolicy>,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors pull individual components out of the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for Arc<AccessPolicy> {
    fn from_ref(app_state: &AppState) -> Arc<AccessPolicy> {
        app_state.policy.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the full routing structure, applies the access gate and the
/// observability stack, and registers the application state.
///
/// The gate wraps the entire router (fallback included), so the
/// classification and rule table in [`AccessPolicy`] decide every request
/// exactly once, before routing-tier handlers run.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI, on the gate's open list.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(api::api_routes())
        .merge(areas::area_routes())
        // The access gate: session resolution, classification, rule table,
        // redirect/deny decision for every request.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::access_gate,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers (outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: whole-lifecycle span with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes span creation for `TraceLayer`: includes the `x-request-id`
/// header alongside the HTTP method and URI, so every log line for a request
/// correlates on one ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
