use super::{internal_error, message, Credentials, Message};
use crate::auth::{AuthError, AuthService, HashError};
use axum::{
    extract::{Extension, Form},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserCreated {
    pub email: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path= "/users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "User created", body = UserCreated, content_type = "application/json"),
        (status = 400, description = "Missing field or email already registered", body = Message),
    ),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn register(
    service: Extension<AuthService>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let Some((email, password)) = payload.and_then(|Form(credentials)| credentials.into_parts())
    else {
        return message(StatusCode::BAD_REQUEST, "email and password are required");
    };

    debug!("registering user");

    match service.register(&email, &password).await {
        Ok(user) => (
            StatusCode::OK,
            Json(UserCreated {
                email: user.email,
                message: "user created".to_string(),
            }),
        )
            .into_response(),
        Err(AuthError::AlreadyRegistered) => {
            message(StatusCode::BAD_REQUEST, "email already registered")
        }
        Err(AuthError::Password(HashError::TooLong)) => {
            message(StatusCode::BAD_REQUEST, "password too long")
        }
        Err(err) => internal_error(&err),
    }
}
