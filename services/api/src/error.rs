//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roastery_core::ports::PortError;
use serde_json::json;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a migration failure at startup.
    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Login with an unknown email or a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An integration the request needs is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Port(port) => match port {
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Conflict(_) | PortError::Cancelled => StatusCode::CONFLICT,
                PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PortError::Forbidden(_) => StatusCode::FORBIDDEN,
                PortError::Unauthorized => StatusCode::UNAUTHORIZED,
                PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_)
            | Self::Database(_)
            | Self::Migrate(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The single human-readable line shown to the client.
    fn client_message(&self) -> String {
        match self {
            Self::Port(PortError::NotFound(msg))
            | Self::Port(PortError::Conflict(msg))
            | Self::Port(PortError::InvalidInput(msg))
            | Self::Port(PortError::Unavailable(msg))
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::Port(PortError::Forbidden(_)) => {
                "You do not have permission to do that".to_string()
            }
            Self::Port(PortError::Unauthorized) => "Please sign in to continue".to_string(),
            Self::InvalidCredentials => self.to_string(),
            Self::Port(PortError::Cancelled) => {
                "Your session ended before the request finished".to_string()
            }
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Request failed");
        } else if let Self::Port(PortError::Forbidden(reason)) = &self {
            tracing::warn!(%reason, "Request denied");
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}
