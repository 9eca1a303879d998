pub mod admin;
pub mod auth;
pub mod contact;
pub mod courses;
pub mod middleware;
pub mod products;
pub mod profile;
pub mod rest;
pub mod sample_orders;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;
