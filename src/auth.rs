//! Identity: admin users, sessions, and credential checks. Sessions expire
//! lazily on read; an expired-but-undeleted row never resolves to a user.

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::store::{CompareOp, DataStore, Predicate, StoreQuery};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "admin_users";
pub const SESSIONS_COLLECTION: &str = "sessions";

/// Role that bypasses all permission checks.
pub const ADMIN_ROLE: &str = "admin";
/// Role reported when no valid session resolves.
pub const GUEST_ROLE: &str = "guest";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

impl AdminUser {
    /// Hash and set the password (argon2id, salted). Plaintext is never stored.
    pub fn set_password(&mut self, password: &str) -> Result<(), AdminError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AdminError::BadRequest(format!("password hash: {}", e)))?;
        self.password_hash = hash.to_string();
        Ok(())
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Opaque token; doubles as the row key.
    pub id: String,
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
}

/// Resolve a presented token to a user and role. Missing token, missing
/// session, or `now >= expires_at` all resolve to `(None, "guest")`.
pub async fn identity_from_token(
    store: &dyn DataStore,
    token: Option<&str>,
) -> Result<(Option<AdminUser>, String), AdminError> {
    let Some(token) = token else {
        return Ok((None, GUEST_ROLE.into()));
    };
    let Some(row) = store
        .find_by_key(SESSIONS_COLLECTION, &serde_json::json!(token))
        .await?
    else {
        return Ok((None, GUEST_ROLE.into()));
    };
    let session: Session = serde_json::from_value(row)
        .map_err(|e| AdminError::BadRequest(format!("malformed session row: {}", e)))?;
    if Utc::now() >= session.expires_at {
        return Ok((None, GUEST_ROLE.into()));
    }
    let Some(row) = store
        .find_by_key(USERS_COLLECTION, &serde_json::json!(session.user_id))
        .await?
    else {
        return Ok((None, GUEST_ROLE.into()));
    };
    let user: AdminUser = serde_json::from_value(row)
        .map_err(|e| AdminError::BadRequest(format!("malformed user row: {}", e)))?;
    let role = user.role.clone();
    Ok((Some(user), role))
}

/// Check credentials and mint a session. Unknown email and wrong password
/// fail identically; nothing distinguishes the two to the caller.
pub async fn login(
    store: &dyn DataStore,
    config: &AdminConfig,
    email: &str,
    password: &str,
) -> Result<(AdminUser, Session), AdminError> {
    let rows = store
        .find_all(
            USERS_COLLECTION,
            &StoreQuery::filtered(vec![Predicate::new("email", CompareOp::Eq, serde_json::json!(email))]),
        )
        .await?;
    let Some(row) = rows.into_iter().next() else {
        return Err(AdminError::InvalidCredentials);
    };
    let user: AdminUser = serde_json::from_value(row)
        .map_err(|e| AdminError::BadRequest(format!("malformed user row: {}", e)))?;
    if !user.verify_password(password) {
        return Err(AdminError::InvalidCredentials);
    }
    let session = Session {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id,
        expires_at: Utc::now() + Duration::hours(config.session_ttl_hours),
    };
    store
        .save(SESSIONS_COLLECTION, &serde_json::to_value(&session).expect("session serializes"))
        .await?;
    tracing::debug!(user = %user.email, "session created");
    Ok((user, session))
}

/// Delete the session row for a presented token. Deleting a nonexistent
/// token is not an error.
pub async fn logout(store: &dyn DataStore, token: &str) -> Result<(), AdminError> {
    store
        .delete_by_key(SESSIONS_COLLECTION, &serde_json::json!(token))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let mut user = AdminUser::default();
        user.set_password("hunter2").unwrap();
        assert_ne!(user.password_hash, "hunter2");
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
    }

    #[test]
    fn empty_hash_never_verifies() {
        let user = AdminUser::default();
        assert!(!user.verify_password(""));
    }
}
