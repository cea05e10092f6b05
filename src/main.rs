use content_service::{
    AppState,
    auth::TokenVerifier,
    config::{AppConfig, Env},
    create_router,
    identity::{HttpIdentityClient, IdentityState},
    repository::{PostgresContentStore, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup order: configuration, logging, verification key, storage, identity client,
/// HTTP server. Any failure before the server is listening aborts the process.
#[tokio::main]
async fn main() {
    // 1. Configuration
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "content_service=debug,tower_http=info".into());

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

    // 3. Token verification key, loaded exactly once.
    let verifier = TokenVerifier::from_file(config.token_algorithm, &config.token_public_key)
        .unwrap_or_else(|e| panic!("FATAL: cannot load token verification key: {e}"));
    tracing::info!(
        algorithm = ?config.token_algorithm,
        key = %config.token_public_key.display(),
        "token verification key loaded"
    );

    // 4. Storage
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let store = PostgresContentStore::new(pool);
    store
        .ensure_schema()
        .await
        .expect("FATAL: Failed to create content tables.");
    let repo = Arc::new(store) as RepositoryState;

    // 5. Identity service client, shared by every request.
    let identity = HttpIdentityClient::new(&config.identity_url, config.identity_timeout)
        .expect("FATAL: Invalid identity service address. Check AUTH_SCHEME/AUTH_NAME/AUTH_PORT.");
    tracing::info!(url = %config.identity_url, "identity service configured");
    let identity = Arc::new(identity) as IdentityState;

    // 6. State, router, server
    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(repo, identity, Arc::new(verifier)));

    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind listening socket.");

    tracing::info!("Listening on {addr}");
    tracing::info!("OpenAPI document available at: http://{addr}/api-docs/openapi.json");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
