//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{Argon2Hasher, GoogleTokenVerifier, MemoryStore, PgStore},
    config::{Config, StoreBackend},
    error::ApiError,
    router,
    web::AppState,
};
use axum::extract::DefaultBodyLimit;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use roastery_core::ports::{DatabaseService, IdentityVerifier};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Document Store ---
    let db: Arc<dyn DatabaseService> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;
            let store = PgStore::new(db_pool);
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize Identity Adapters ---
    let verifier: Option<Arc<dyn IdentityVerifier>> = match &config.google_client_id {
        Some(client_id) => {
            let google = GoogleTokenVerifier::new(client_id.clone())
                .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?;
            Some(Arc::new(google))
        }
        None => {
            warn!("GOOGLE_CLIENT_ID is not set; Google sign-in is disabled");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        db,
        Arc::new(Argon2Hasher::new()),
        verifier,
        config.clone(),
    ));

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let app = router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
