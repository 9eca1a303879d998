pub mod db;
pub mod google;
pub mod password;

pub use db::PgStore;
pub use google::GoogleTokenVerifier;
pub use password::Argon2Hasher;
pub use roastery_core::memory::MemoryStore;
