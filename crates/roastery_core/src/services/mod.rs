//! Application services. Each one validates its form input and talks to the
//! store only through an [`AuthorizedStore`](crate::access::AuthorizedStore).

pub mod accounts;
pub mod contact;
pub mod courses;
pub mod products;
pub mod sample_orders;
pub mod users;
pub mod validation;

pub use accounts::{AccountPolicy, AuthGateway, Provisioned, SignedIn, SignupForm};
