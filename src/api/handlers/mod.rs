pub mod health;
pub use self::health::health;

pub mod index;
pub use self::index::index;

pub mod profile;
pub use self::profile::profile;

pub mod sessions;
pub use self::sessions::{login, logout};

pub mod users;
pub use self::users::register;

// common types and responses for the handlers
use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;
use utoipa::ToSchema;

/// Form body of `POST /users` and `POST /sessions`.
#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Password)]
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields, or `None` when either is missing or empty.
    #[must_use]
    pub fn into_parts(self) -> Option<(String, String)> {
        let email = self.email.filter(|email| !email.is_empty())?;
        let password = self.password.filter(|password| !password.is_empty())?;
        Some((email, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(Message::new(message))).into_response()
}

pub(crate) fn error_body(status: StatusCode) -> Response {
    let error = status.canonical_reason().unwrap_or("Error").to_string();
    (status, Json(ErrorBody { error })).into_response()
}

/// Log `err` and answer with a body that carries no detail.
pub(crate) fn internal_error(err: &AuthError) -> Response {
    error!("request failed: {}", err);

    error_body(StatusCode::INTERNAL_SERVER_ERROR)
}
