use fitness_portal::{
    AccessPolicy, AppState,
    config::{AppConfig, Env},
    create_router,
    mailer::{HttpMailer, MailerState},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Asynchronous entry point: initializes configuration, logging, the
/// database pool, the mail client, the access policy and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup: RUST_LOG wins, sensible defaults otherwise.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fitness_portal=debug,tower_http=info,axum=trace".into());

    // 3. Log format per environment: pretty for humans, JSON for aggregators.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Mail client initialization.
    let mailer = Arc::new(HttpMailer::new(
        &config.mail_endpoint,
        &config.mail_api_key,
        &config.mail_from,
        &config.portal_url,
    )) as MailerState;

    // 6. Access policy: built once here, injected through the state, never
    // mutated afterwards.
    let policy = Arc::new(AccessPolicy::standard(config.unmatched_api));

    // 7. Unified state assembly.
    let app_state = AppState {
        repo,
        mailer,
        policy,
        config,
    };

    // 8. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
