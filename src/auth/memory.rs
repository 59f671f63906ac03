//! In-process credential store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{CredentialStore, StoreError, User};

/// Users keyed by id; uniqueness checks and writes share one write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_session(&self, session_token: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.session_token.as_deref() == Some(session_token))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|user| user.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            session_token: None,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        if let Some(token) = session_token {
            let taken = users
                .values()
                .any(|user| user.id != user_id && user.session_token.as_deref() == Some(token));
            if taken {
                return Err(StoreError::DuplicateSession);
            }
        }

        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.session_token = session_token.map(str::to_string);

        Ok(())
    }
}
