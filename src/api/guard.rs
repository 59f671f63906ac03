use super::handlers::{error_body, internal_error};
use crate::auth::AuthStrategy;
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Authenticate requests whose path the strategy does not exclude.
///
/// No credentials answer 401, credentials that resolve to no user answer
/// 403. On success the [`crate::auth::User`] is added to the request
/// extensions for the handler.
pub async fn require_auth(
    Extension(strategy): Extension<Arc<dyn AuthStrategy>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !strategy.require_auth(request.uri().path()) {
        return next.run(request).await;
    }

    let headers = request.headers().clone();

    if !strategy.has_credentials(&headers) {
        debug!("missing credentials");
        return error_body(StatusCode::UNAUTHORIZED);
    }

    match strategy.current_user(&headers).await {
        Ok(Some(user)) => {
            debug!(user_id = %user.id, "authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => error_body(StatusCode::FORBIDDEN),
        Err(err) => internal_error(&err),
    }
}
