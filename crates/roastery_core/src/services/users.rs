//! Admin users panel.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{ProfileFilter, UserProfile};
use crate::ports::PortResult;

pub async fn list_users(
    store: &AuthorizedStore,
    filter: &ProfileFilter,
) -> PortResult<Vec<UserProfile>> {
    store.list_profiles(filter).await
}

#[instrument(skip(store))]
pub async fn set_admin(store: &AuthorizedStore, uid: Uuid, is_admin: bool) -> PortResult<UserProfile> {
    let profile = store.set_admin(uid, is_admin).await?;
    info!(%uid, is_admin, "Admin flag changed");
    Ok(profile)
}

/// Removes the account along with its enrollments and sample orders.
#[instrument(skip(store))]
pub async fn delete_user(store: &AuthorizedStore, uid: Uuid) -> PortResult<()> {
    store.delete_profile(uid).await?;
    info!(%uid, "User deleted");
    Ok(())
}
