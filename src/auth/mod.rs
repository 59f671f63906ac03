//! Credential & session authentication core.
//!
//! [`AuthService`] owns no state of its own: user records live in a
//! [`CredentialStore`], passwords go through a [`PasswordHasher`]. Per user
//! it drives a two-state machine over the stored session token:
//!
//! ```text
//!   LoggedOut --create_session--> LoggedIn
//!   LoggedIn  --create_session--> LoggedIn   (previous token invalidated)
//!   LoggedIn  --destroy_session-> LoggedOut
//! ```
//!
//! ## Outcomes vs failures
//!
//! Lookups that miss are ordinary results: `valid_login` answers `false`,
//! `create_session` and `get_user_from_session` answer `None`. Only a taken
//! email on `register` is a domain error ([`AuthError::AlreadyRegistered`]).
//! Store connectivity failures propagate unchanged and are never retried.
//!
//! ## Storage of secrets
//!
//! Passwords are stored as Argon2id PHC strings. Session tokens are returned
//! to the caller once; the store only sees their SHA-256 digest.

pub mod cookie;
mod error;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod service;
pub mod store;
pub mod strategy;
pub mod token;

pub use cookie::SessionCookie;
pub use error::AuthError;
pub use memory::MemoryStore;
pub use password::{Argon2Hasher, HashError, PasswordHasher};
pub use postgres::PgStore;
pub use service::AuthService;
pub use store::{CredentialStore, StoreError, User};
pub use strategy::{AuthStrategy, AuthType, BasicAuth, PathPolicy, SessionAuth};
