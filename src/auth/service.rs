//! Registration, login validation and the session lifecycle.

use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    error::AuthError,
    password::PasswordHasher,
    store::{CredentialStore, StoreError, User},
    token::{generate_session_token, hash_session_token},
};

const SESSION_INSERT_ATTEMPTS: usize = 3;

/// Stateless coordinator over a [`CredentialStore`] and a [`PasswordHasher`].
///
/// Cloning is cheap; every clone shares the same store and hasher.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    // verified against when the email is unknown, so both login paths
    // cost one full hash
    decoy_hash: Arc<str>,
}

impl AuthService {
    /// # Errors
    /// Returns an error if the decoy hash cannot be computed.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, AuthError> {
        let mut seed = [0u8; 32];
        OsRng.try_fill_bytes(&mut seed)?;
        let decoy: String = seed.iter().map(|b| format!("{b:02x}")).collect();
        let decoy_hash = hasher.hash(&decoy)?;

        Ok(Self {
            store,
            hasher,
            decoy_hash: Arc::from(decoy_hash),
        })
    }

    /// [`AuthService::new`] on the blocking pool, for use inside a runtime.
    ///
    /// # Errors
    /// Returns an error if the decoy hash cannot be computed.
    pub async fn build(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, AuthError> {
        tokio::task::spawn_blocking(move || Self::new(store, hasher)).await?
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create a user for `email`.
    ///
    /// # Errors
    /// [`AuthError::AlreadyRegistered`] if the email is taken, including when
    /// a concurrent registration wins the insert.
    #[instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        match self.store.find_by_email(email).await {
            Ok(_) => {
                debug!("registration rejected, email taken");
                return Err(AuthError::AlreadyRegistered);
            }
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let password_hash = self.hash(password).await?;

        match self.store.insert(email, &password_hash).await {
            Ok(user) => {
                info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            Err(StoreError::DuplicateEmail) => {
                debug!("registration lost insert race");
                Err(AuthError::AlreadyRegistered)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Whether `password` matches the account for `email`.
    ///
    /// Unknown emails and wrong passwords are indistinguishable, including
    /// in timing.
    ///
    /// # Errors
    /// Only on store or hashing failure; a mismatch is `Ok(false)`.
    pub async fn valid_login(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        Ok(self.authenticate(email, password).await?.is_some())
    }

    /// The user owning `email` if `password` matches.
    ///
    /// # Errors
    /// Only on store or hashing failure.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = match self.store.find_by_email(email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(err) => return Err(err.into()),
        };

        let hash = user.as_ref().map_or_else(
            || self.decoy_hash.to_string(),
            |user| user.password_hash.clone(),
        );

        let matched = self.verify(hash, password).await?;

        Ok(user.filter(|_| matched))
    }

    /// Start a session for `email`, replacing any previous one.
    ///
    /// Returns `Ok(None)` when no such user exists.
    ///
    /// # Errors
    /// On store failure or if the OS random generator fails.
    #[instrument(skip_all)]
    pub async fn create_session(&self, email: &str) -> Result<Option<String>, AuthError> {
        let user = match self.store.find_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        for _ in 0..SESSION_INSERT_ATTEMPTS {
            let token = generate_session_token()?;
            let digest = hash_session_token(&token);

            match self.store.update_session(user.id, Some(&digest)).await {
                Ok(()) => {
                    info!(user_id = %user.id, "session created");
                    return Ok(Some(token));
                }
                Err(StoreError::DuplicateSession) => {
                    warn!(user_id = %user.id, "session token collision, retrying");
                }
                Err(StoreError::NotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::DuplicateSession.into())
    }

    /// Resolve a session token to its user.
    ///
    /// # Errors
    /// Only on store failure; empty or unknown tokens are `Ok(None)`.
    #[instrument(skip_all)]
    pub async fn get_user_from_session(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        match self.store.find_by_session(&hash_session_token(token)).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Log out `user_id`. Idempotent, unknown ids included.
    ///
    /// # Errors
    /// Only on store failure.
    #[instrument(skip(self))]
    pub async fn destroy_session(&self, user_id: Uuid) -> Result<(), AuthError> {
        match self.store.update_session(user_id, None).await {
            Ok(()) => {
                info!("session destroyed");
                Ok(())
            }
            Err(StoreError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        Ok(tokio::task::spawn_blocking(move || hasher.hash(&password)).await??)
    }

    async fn verify(&self, hash: String, password: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        Ok(tokio::task::spawn_blocking(move || hasher.verify(&hash, &password)).await?)
    }
}
