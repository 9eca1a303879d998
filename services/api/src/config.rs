//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;

use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which `DatabaseService` implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("'{other}' is not one of postgres, memory")),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub session_ttl_days: i64,
    pub google_client_id: Option<String>,
    pub admin_emails: Vec<String>,
    /// Business number behind the WhatsApp links; the endpoints answer 503 without it.
    pub whatsapp_number: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Store ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;
        let store_backend: StoreBackend = parse_var("STORE_BACKEND", "postgres")?;
        let database_url = optional_var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", "5")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = optional_var("CORS_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Accounts ---
        let session_ttl_days: i64 = parse_var("SESSION_TTL_DAYS", "30")?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be a positive number of days".to_string(),
            ));
        }
        let google_client_id = optional_var("GOOGLE_CLIENT_ID");
        let admin_emails = optional_var("ADMIN_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // --- Messaging ---
        let whatsapp_number = optional_var("WHATSAPP_NUMBER");

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            db_max_connections,
            log_level,
            cors_origin,
            session_ttl_days,
            google_client_id,
            admin_emails,
            whatsapp_number,
        })
    }
}

impl Default for Config {
    /// An in-memory setup with no integrations, for tests and local runs.
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 5,
            log_level: Level::INFO,
            cors_origin: "http://localhost:3000".to_string(),
            session_ttl_days: 30,
            google_client_id: None,
            admin_emails: Vec::new(),
            whatsapp_number: None,
        }
    }
}

/// Reads a variable, treating blank values as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = optional_var(name).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
