//! services/api/src/adapters/password.rs
//!
//! Argon2 implementation of the `CredentialHasher` port.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use roastery_core::ports::{CredentialHasher, PortError, PortResult};
use tracing::error;

/// Hashes with the default Argon2id parameters. Work runs on the blocking pool.
#[derive(Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

fn hash_blocking(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

fn verify_blocking(password: &str, hashed: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Stored password hash is malformed".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[async_trait]
impl CredentialHasher for Argon2Hasher {
    async fn hash_password(&self, password: &str) -> PortResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }

    async fn verify_password(&self, password: &str, hashed: &str) -> PortResult<bool> {
        let (password, hashed) = (password.to_string(), hashed.to_string());
        tokio::task::spawn_blocking(move || verify_blocking(&password, &hashed))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}
