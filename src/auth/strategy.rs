//! Request authentication strategies.
//!
//! A strategy answers two questions for the HTTP layer: does this path need
//! authentication, and who is the caller. [`BasicAuth`] reads credentials
//! from an `Authorization: Basic` header on every request, [`SessionAuth`]
//! resolves a session token issued by [`AuthService::create_session`].
//! Which one is active is a deployment choice ([`AuthType`]).

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};
use std::{fmt, str::FromStr, sync::Arc};

use super::{cookie::SessionCookie, error::AuthError, service::AuthService, store::User};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    Basic,
    Session,
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "basic" | "basic_auth" => Ok(Self::Basic),
            "session" | "session_auth" => Ok(Self::Session),
            _ => Err(format!("unknown auth type: {value}")),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// Paths that skip authentication.
#[derive(Clone, Debug, Default)]
pub struct PathPolicy {
    excluded: Vec<String>,
}

impl PathPolicy {
    #[must_use]
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` requires authentication.
    ///
    /// `path` is compared with a trailing slash appended, so `/status` and
    /// `/status/` both match an exclusion of `/status/`. Exclusions without a
    /// trailing slash never match.
    #[must_use]
    pub fn require_auth(&self, path: &str) -> bool {
        if path.is_empty() || self.excluded.is_empty() {
            return true;
        }

        let path = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };

        !self
            .excluded
            .iter()
            .any(|excluded| excluded.ends_with('/') && *excluded == path)
    }
}

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn policy(&self) -> &PathPolicy;

    fn require_auth(&self, path: &str) -> bool {
        self.policy().require_auth(path)
    }

    /// Whether the request carries the credential this strategy reads.
    fn has_credentials(&self, headers: &HeaderMap) -> bool;

    /// The authenticated caller, `None` when credentials are missing or bad.
    ///
    /// # Errors
    /// Only on store or hashing failure.
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError>;
}

/// Build the strategy selected by configuration.
#[must_use]
pub fn build(
    auth_type: AuthType,
    service: AuthService,
    policy: PathPolicy,
    cookie: SessionCookie,
) -> Arc<dyn AuthStrategy> {
    match auth_type {
        AuthType::Basic => Arc::new(BasicAuth::new(service, policy)),
        AuthType::Session => Arc::new(SessionAuth::new(service, policy, cookie)),
    }
}

#[derive(Clone)]
pub struct BasicAuth {
    service: AuthService,
    policy: PathPolicy,
}

impl BasicAuth {
    #[must_use]
    pub fn new(service: AuthService, policy: PathPolicy) -> Self {
        Self { service, policy }
    }

    #[must_use]
    pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
        headers.get(AUTHORIZATION)?.to_str().ok()
    }

    /// The base64 part of a `Basic` authorization header.
    #[must_use]
    pub fn extract_base64_authorization_header(header: &str) -> Option<&str> {
        header.strip_prefix("Basic ")
    }

    #[must_use]
    pub fn decode_base64_authorization_header(encoded: &str) -> Option<String> {
        let bytes = Base64::decode_vec(encoded.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Split `email:password` at the first colon.
    #[must_use]
    pub fn extract_user_credentials(decoded: &str) -> Option<(String, String)> {
        decoded
            .split_once(':')
            .map(|(email, password)| (email.to_string(), password.to_string()))
    }

    /// # Errors
    /// Only on store or hashing failure.
    pub async fn user_object_from_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        self.service.authenticate(email, password).await
    }
}

#[async_trait]
impl AuthStrategy for BasicAuth {
    fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    fn has_credentials(&self, headers: &HeaderMap) -> bool {
        Self::authorization_header(headers).is_some()
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        let credentials = Self::authorization_header(headers)
            .and_then(Self::extract_base64_authorization_header)
            .and_then(Self::decode_base64_authorization_header)
            .and_then(|decoded| Self::extract_user_credentials(&decoded));

        match credentials {
            Some((email, password)) => self.user_object_from_credentials(&email, &password).await,
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
pub struct SessionAuth {
    service: AuthService,
    policy: PathPolicy,
    cookie: SessionCookie,
}

impl SessionAuth {
    #[must_use]
    pub fn new(service: AuthService, policy: PathPolicy, cookie: SessionCookie) -> Self {
        Self {
            service,
            policy,
            cookie,
        }
    }
}

#[async_trait]
impl AuthStrategy for SessionAuth {
    fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    fn has_credentials(&self, headers: &HeaderMap) -> bool {
        self.cookie.extract(headers).is_some()
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        match self.cookie.extract(headers) {
            Some(token) => self.service.get_user_from_session(&token).await,
            None => Ok(None),
        }
    }
}
