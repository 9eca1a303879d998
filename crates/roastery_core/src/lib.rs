pub mod access;
pub mod domain;
pub mod memory;
pub mod messaging;
pub mod ports;
pub mod services;
pub mod session;

pub use access::{AuthorizedStore, Principal};
pub use domain::*;
pub use memory::MemoryStore;
pub use ports::{
    CredentialHasher, DatabaseService, IdentityVerifier, PortError, PortResult,
};
pub use services::{AccountPolicy, AuthGateway, Provisioned, SignedIn, SignupForm};
pub use session::{SessionContext, SessionRegistry};
