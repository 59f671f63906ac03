use super::{error_body, internal_error, message, Credentials, ErrorBody, Message};
use crate::auth::{AuthService, SessionCookie};
use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoggedIn {
    pub email: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path= "/sessions",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Logged in, session cookie set", body = LoggedIn, content_type = "application/json"),
        (status = 400, description = "Missing field", body = Message),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    ),
    tag= "sessions"
)]
#[instrument(skip_all)]
pub async fn login(
    service: Extension<AuthService>,
    cookie: Extension<SessionCookie>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let Some((email, password)) = payload.and_then(|Form(credentials)| credentials.into_parts())
    else {
        return message(StatusCode::BAD_REQUEST, "email and password are required");
    };

    match service.valid_login(&email, &password).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("invalid credentials");
            return error_body(StatusCode::UNAUTHORIZED);
        }
        Err(err) => return internal_error(&err),
    }

    let token = match service.create_session(&email).await {
        Ok(Some(token)) => token,
        // the user was removed between the two calls
        Ok(None) => return error_body(StatusCode::UNAUTHORIZED),
        Err(err) => return internal_error(&err),
    };

    match cookie.issue(&token) {
        Ok(value) => (
            StatusCode::OK,
            [(SET_COOKIE, value)],
            Json(LoggedIn {
                email,
                message: "logged in".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to build session cookie: {}", err);
            error_body(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    delete,
    path= "/sessions",
    responses (
        (status = 204, description = "Logged out, session cookie cleared"),
        (status = 403, description = "No active session", body = ErrorBody),
    ),
    tag= "sessions"
)]
#[instrument(skip_all)]
pub async fn logout(
    service: Extension<AuthService>,
    cookie: Extension<SessionCookie>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = cookie.extract(&headers) else {
        return error_body(StatusCode::FORBIDDEN);
    };

    let user = match service.get_user_from_session(&token).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_body(StatusCode::FORBIDDEN),
        Err(err) => return internal_error(&err),
    };

    if let Err(err) = service.destroy_session(user.id).await {
        return internal_error(&err);
    }

    match cookie.clear() {
        Ok(value) => (StatusCode::NO_CONTENT, [(SET_COOKIE, value)]).into_response(),
        Err(err) => {
            error!("Failed to build session cookie: {}", err);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}
