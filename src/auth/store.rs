//! Credential store contract and the user record it persists.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Exact-match identity; never normalized.
    pub email: String,
    pub password_hash: String,
    /// Digest of the active session token, `None` while logged out.
    pub session_token: Option<String>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("session token already in use")]
    DuplicateSession,
    #[error("credential store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Persistence for user records.
///
/// Uniqueness of `email` and `session_token` is enforced here, atomically;
/// callers never rely on a prior lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_session(&self, session_token: &str) -> Result<User, StoreError>;

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn update_session(
        &self,
        user_id: Uuid,
        session_token: Option<&str>,
    ) -> Result<(), StoreError>;
}
