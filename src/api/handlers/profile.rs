use super::{error_body, ErrorBody};
use crate::auth::User;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Profile {
    pub email: String,
}

#[utoipa::path(
    get,
    path= "/profile",
    responses (
        (status = 200, description = "The authenticated user", body = Profile, content_type = "application/json"),
        (status = 401, description = "No credentials", body = ErrorBody),
        (status = 403, description = "Credentials do not resolve to a user", body = ErrorBody),
    ),
    tag= "users"
)]
pub async fn profile(user: Option<Extension<User>>) -> Response {
    match user {
        Some(Extension(user)) => Json(Profile { email: user.email }).into_response(),
        // path excluded from authentication
        None => error_body(StatusCode::FORBIDDEN),
    }
}
