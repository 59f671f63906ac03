//! # Turnstile
//!
//! `turnstile` is the credential and session core of a web backend. It lets
//! users register with an email and password, validates logins and issues
//! opaque session tokens that later requests present to prove identity.
//!
//! The [`auth`] module holds the domain: an Argon2id [`auth::PasswordHasher`],
//! the [`auth::CredentialStore`] contract (in-memory and `PostgreSQL`
//! implementations) and the [`auth::AuthService`] that coordinates them.
//! [`api`] exposes the service over HTTP and [`redact`] keeps PII out of the
//! logs.

pub mod api;
pub mod auth;
pub mod cli;
pub mod redact;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash() {
        assert!(!GIT_COMMIT_HASH.is_empty());
    }

    #[test]
    fn test_app_user_agent() {
        assert_eq!(
            APP_USER_AGENT,
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        );
    }
}
