//! crates/roastery_core/src/services/accounts.rs
//!
//! The auth/profile gateway: sign-up, login, Google sign-in, logout, and the
//! profile read/update pair used by the account pages.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{AuthSession, NewProfile, ProfilePatch, Provider, UserProfile};
use crate::ports::{CredentialHasher, DatabaseService, IdentityVerifier, PortError, PortResult};
use crate::services::validation::{normalize_email, validate_password, validate_phone};
use crate::session::SessionRegistry;

/// Server-side account settings.
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    admin_emails: Vec<String>,
    pub session_ttl: Duration,
}

impl AccountPolicy {
    pub fn new(admin_emails: impl IntoIterator<Item = String>, session_ttl: Duration) -> Self {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            session_ttl,
        }
    }

    /// Whether a newly created profile for `email` starts out as an admin.
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|a| a.eq_ignore_ascii_case(email))
    }
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self::new(Vec::new(), Duration::days(30))
    }
}

/// The sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Result of provisioning a profile document.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub profile: UserProfile,
    pub created: bool,
}

/// Result of any successful sign-in path.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub profile: UserProfile,
    pub session: AuthSession,
    pub created: bool,
    /// A brand-new Google user without a phone number; the client should ask for one.
    pub needs_phone_number: bool,
}

pub struct AuthGateway {
    db: Arc<dyn DatabaseService>,
    hasher: Arc<dyn CredentialHasher>,
    verifier: Option<Arc<dyn IdentityVerifier>>,
    sessions: Arc<SessionRegistry>,
    policy: AccountPolicy,
}

impl AuthGateway {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        hasher: Arc<dyn CredentialHasher>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
        sessions: Arc<SessionRegistry>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            db,
            hasher,
            verifier,
            sessions,
            policy,
        }
    }

    pub fn policy(&self) -> &AccountPolicy {
        &self.policy
    }

    fn system(&self) -> AuthorizedStore {
        AuthorizedStore::system(self.db.clone())
    }

    /// Creates the profile and its credentials in one store write, then opens a session.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn signup(&self, form: SignupForm) -> PortResult<SignedIn> {
        let email = normalize_email(&form.email)?;
        validate_password(&form.password)?;
        if !form.phone_number.trim().is_empty() {
            validate_phone(form.phone_number.trim())?;
        }

        let store = self.system();
        match store.get_credentials_by_email(&email).await {
            Ok(_) => {
                return Err(PortError::Conflict(
                    "An account with this email already exists".to_string(),
                ))
            }
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        if store.find_profile_by_email(&email).await?.is_some() {
            return Err(PortError::Conflict(
                "This email is registered through Google; please sign in with Google".to_string(),
            ));
        }

        let hashed = self.hasher.hash_password(&form.password).await?;
        let now = Utc::now();
        let mut profile = UserProfile::from_new(
            NewProfile {
                uid: Uuid::new_v4(),
                email: email.clone(),
                display_name: form.display_name.filter(|n| !n.trim().is_empty()),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                phone_number: form.phone_number.trim().to_string(),
                provider: Provider::Email,
                is_admin: self.policy.is_bootstrap_admin(&email),
            },
            now,
        );
        profile.last_login = Some(now);
        let profile = store.create_account(profile, &hashed).await?;
        let session = self.open_session(&store, profile.uid).await?;
        info!(uid = %profile.uid, "Account created");

        Ok(SignedIn {
            profile,
            session,
            created: true,
            needs_phone_number: false,
        })
    }

    /// Verifies the password and upserts `last_login`.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> PortResult<SignedIn> {
        let email = email.trim().to_lowercase();
        let store = self.system();
        let credentials = match store.get_credentials_by_email(&email).await {
            Ok(c) => c,
            Err(PortError::NotFound(_)) => return Err(PortError::Unauthorized),
            Err(e) => return Err(e),
        };
        if !self
            .hasher
            .verify_password(password, &credentials.hashed_password)
            .await?
        {
            warn!(user_id = %credentials.user_id, "Rejected login with wrong password");
            return Err(PortError::Unauthorized);
        }

        store.record_login(credentials.user_id, Utc::now()).await?;
        let profile = store.get_profile(credentials.user_id).await?;
        let session = self.open_session(&store, credentials.user_id).await?;
        Ok(SignedIn {
            profile,
            session,
            created: false,
            needs_phone_number: false,
        })
    }

    /// Resolves a verified Google identity to a uid and provisions its profile.
    ///
    /// Resolution order: existing federated link, then a profile with the same
    /// email, then a new uid. The link write is insert-if-absent, so duplicate
    /// callbacks converge on whichever uid won.
    #[instrument(skip_all)]
    pub async fn sign_in_with_google(&self, id_token: &str) -> PortResult<SignedIn> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| PortError::Unavailable("Google sign-in is not configured".to_string()))?;
        let identity = verifier.verify_id_token(id_token).await?;
        let email = normalize_email(&identity.email)?;

        let store = self.system();
        let candidate = match store
            .find_federated_identity(Provider::Google, &identity.subject)
            .await?
        {
            Some(uid) => uid,
            None => match store.find_profile_by_email(&email).await? {
                Some(existing) => existing.uid,
                None => Uuid::new_v4(),
            },
        };
        let uid = store
            .link_federated_identity(Provider::Google, &identity.subject, candidate)
            .await?;

        let provisioned = self
            .provision_profile(NewProfile {
                uid,
                email: email.clone(),
                display_name: identity.display_name.clone(),
                first_name: identity.given_name.clone().unwrap_or_default(),
                last_name: identity.family_name.clone().unwrap_or_default(),
                phone_number: String::new(),
                provider: Provider::Google,
                is_admin: self.policy.is_bootstrap_admin(&email),
            })
            .await?;
        let needs_phone_number =
            provisioned.created && provisioned.profile.phone_number.trim().is_empty();
        let session = self.open_session(&store, uid).await?;
        info!(%uid, created = provisioned.created, "Google sign-in");

        Ok(SignedIn {
            profile: provisioned.profile,
            session,
            created: provisioned.created,
            needs_phone_number,
        })
    }

    /// Creates the profile if absent and records the login.
    ///
    /// A repeat call for the same uid never creates a second document; it only
    /// fills names that are still blank on the stored one.
    pub async fn provision_profile(&self, new: NewProfile) -> PortResult<Provisioned> {
        let store = self.system();
        let now = Utc::now();
        let uid = new.uid;
        let incoming = new.clone();

        let (mut profile, created) = store
            .insert_profile_if_absent(UserProfile::from_new(new, now))
            .await?;
        if !created {
            let patch = blank_name_fill(&profile, &incoming);
            if !patch.is_empty() {
                profile = store.merge_profile(uid, &patch, now).await?;
            }
        }
        store.record_login(uid, now).await?;
        profile.last_login = Some(now);
        Ok(Provisioned { profile, created })
    }

    async fn open_session(&self, store: &AuthorizedStore, uid: Uuid) -> PortResult<AuthSession> {
        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            user_id: uid,
            expires_at: Utc::now() + self.policy.session_ttl,
        };
        store
            .create_auth_session(&session.id, session.user_id, session.expires_at)
            .await?;
        Ok(session)
    }

    /// Deletes the auth session and cancels whatever is still running on it.
    /// Requests that validated the session just before it was deleted are
    /// refused by the registry afterwards.
    #[instrument(skip_all)]
    pub async fn logout(&self, session_id: &str) -> PortResult<()> {
        let store = self.system();
        let expires_at = match store.validate_auth_session(session_id).await {
            Ok(session) => Some(session.expires_at),
            Err(PortError::Unauthorized) => None,
            Err(e) => return Err(e),
        };
        store.delete_auth_session(session_id).await?;
        let had_live_requests = self.sessions.revoke(session_id, expires_at).await;
        info!(had_live_requests, "Session closed");
        Ok(())
    }
}

fn blank_name_fill(existing: &UserProfile, incoming: &NewProfile) -> ProfilePatch {
    let fill = |current: &str, offered: &str| {
        (current.trim().is_empty() && !offered.trim().is_empty()).then(|| offered.to_string())
    };
    ProfilePatch {
        display_name: match (&existing.display_name, &incoming.display_name) {
            (None, Some(name)) if !name.trim().is_empty() => Some(name.clone()),
            _ => None,
        },
        first_name: fill(&existing.first_name, &incoming.first_name),
        last_name: fill(&existing.last_name, &incoming.last_name),
        phone_number: fill(&existing.phone_number, &incoming.phone_number),
        ..ProfilePatch::default()
    }
}

/// `getUserData`: the caller's own profile, or anyone's for admins.
pub async fn get_user_data(store: &AuthorizedStore, uid: Uuid) -> PortResult<UserProfile> {
    store.get_profile(uid).await
}

/// `updateUserProfile`: merges the given fields and leaves the rest untouched.
#[instrument(skip(store, patch))]
pub async fn update_user_profile(
    store: &AuthorizedStore,
    uid: Uuid,
    mut patch: ProfilePatch,
) -> PortResult<UserProfile> {
    if let Some(phone) = patch.phone_number.as_mut() {
        *phone = phone.trim().to_string();
        if !phone.is_empty() {
            validate_phone(phone)?;
        }
    }
    if patch.is_empty() {
        return store.get_profile(uid).await;
    }
    store.merge_profile(uid, &patch, Utc::now()).await
}
