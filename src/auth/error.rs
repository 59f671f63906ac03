use thiserror::Error;

use super::{password::HashError, store::StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The message never includes account details.
    #[error("email already registered")]
    AlreadyRegistered,
    #[error(transparent)]
    Password(#[from] HashError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to generate session token")]
    Entropy(#[from] rand::Error),
    #[error("password hashing task failed")]
    Task(#[from] tokio::task::JoinError),
}
