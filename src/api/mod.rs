#![allow(clippy::needless_for_each)]

use crate::{
    api::handlers::{
        health, health::__path_health, index::__path_index, profile,
        profile::__path_profile, sessions, sessions::__path_login, sessions::__path_logout, users,
        users::__path_register,
    },
    auth::{AuthService, AuthStrategy, SessionCookie},
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;
mod guard;

pub use guard::require_auth;

#[derive(OpenApi)]
#[openapi(
    paths(index, health, register, login, logout, profile),
    components(schemas(
        health::Health,
        handlers::Credentials,
        handlers::Message,
        handlers::ErrorBody,
        users::UserCreated,
        sessions::LoggedIn,
        profile::Profile
    )),
    tags(
        (name = "turnstile", description = "Credential and session authentication API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

/// Build the application router.
///
/// Every route passes through [`require_auth`]; which paths are public is
/// decided by the strategy's path policy.
pub fn router(
    service: AuthService,
    strategy: Arc<dyn AuthStrategy>,
    cookie: SessionCookie,
) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/openapi.json", get(openapi_json))
        .route("/users", post(handlers::register))
        .route(
            "/sessions",
            post(handlers::login).delete(handlers::logout),
        )
        .route("/profile", get(handlers::profile))
        .layer(middleware::from_fn(require_auth))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(service))
                .layer(Extension(strategy))
                .layer(Extension(cookie)),
        )
}

/// Serve `app` until Ctrl-C.
/// # Errors
/// Return error if failed to start the server
pub async fn serve(port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        password::tests::fast_hasher, service::tests::ScriptedStore, strategy, AuthType,
        CredentialStore, MemoryStore, PathPolicy,
    };
    use crate::cli::commands::DEFAULT_EXCLUDED_PATHS;
    use axum::{
        body::to_bytes,
        http::{
            header::{COOKIE, SET_COOKIE},
            StatusCode,
        },
        response::Response,
    };
    use base64ct::{Base64, Encoding};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(auth_type: AuthType) -> Router {
        app_with_store(auth_type, Arc::new(MemoryStore::new()))
    }

    fn app_with_store(auth_type: AuthType, store: Arc<dyn CredentialStore>) -> Router {
        let service = AuthService::new(store, Arc::new(fast_hasher())).unwrap();
        let cookie = SessionCookie::default();
        let policy = PathPolicy::new(DEFAULT_EXCLUDED_PATHS);
        let strategy = strategy::build(auth_type, service.clone(), policy, cookie.clone());
        router(service, strategy, cookie)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn form(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_with(uri: &str, header: HeaderName, value: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header, value)
            .body(Body::empty())
            .unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let value = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        value.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn index_is_public() {
        let app = app(AuthType::Session);
        let response = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await, json!({"message": "Bienvenue"}));
    }

    #[tokio::test]
    async fn health_reports_build() {
        let app = app(AuthType::Session);
        let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
        let body = json_body(response).await;
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn openapi_lists_routes() {
        let app = app(AuthType::Session);
        let response = send(
            &app,
            Request::get("/openapi.json").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["paths"]["/"]["get"].is_object());
        assert!(body["paths"]["/users"].is_object());
        assert!(body["paths"]["/sessions"]["delete"].is_object());
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let app = app(AuthType::Session);

        let body = "email=bob%40x.com&password=secret1";
        let response = send(&app, form(Method::POST, "/users", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"email": "bob@x.com", "message": "user created"})
        );

        let response = send(&app, form(Method::POST, "/users", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"message": "email already registered"})
        );
    }

    #[tokio::test]
    async fn register_requires_both_fields() {
        let app = app(AuthType::Session);

        let response = send(&app, form(Method::POST, "/users", "email=bob%40x.com")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, form(Method::POST, "/users", "email=&password=x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::post("/users").body(Body::empty()).unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let app = app(AuthType::Session);
        let credentials = "email=bob%40x.com&password=secret1";
        send(&app, form(Method::POST, "/users", credentials)).await;

        let response = send(
            &app,
            form(Method::POST, "/sessions", "email=bob%40x.com&password=nope"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let response = send(&app, form(Method::POST, "/sessions", credentials)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        assert!(cookie.starts_with("session_id="));
        assert_eq!(
            json_body(response).await,
            json!({"email": "bob@x.com", "message": "logged in"})
        );

        let response = send(&app, get_with("/profile", COOKIE, &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"email": "bob@x.com"}));

        let request = Request::delete("/sessions")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let response = send(&app, get_with("/profile", COOKIE, &cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await, json!({"error": "Forbidden"}));

        let request = Request::delete("/sessions")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_unknown_email_is_unauthorized() {
        let app = app(AuthType::Session);
        let response = send(
            &app,
            form(Method::POST, "/sessions", "email=ghost%40x.com&password=secret1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_without_credentials() {
        let app = app(AuthType::Session);
        let response = send(&app, Request::get("/profile").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn bearer_token_is_accepted() {
        let app = app(AuthType::Session);
        let credentials = "email=bob%40x.com&password=secret1";
        send(&app, form(Method::POST, "/users", credentials)).await;
        let response = send(&app, form(Method::POST, "/sessions", credentials)).await;
        let cookie = session_cookie(&response);
        let token = cookie.trim_start_matches("session_id=");

        let response = send(
            &app,
            get_with("/profile", AUTHORIZATION, &format!("Bearer {token}")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn basic_auth_protects_profile() {
        let app = app(AuthType::Basic);
        send(
            &app,
            form(Method::POST, "/users", "email=bob%40x.com&password=secret1"),
        )
        .await;

        let good = format!("Basic {}", Base64::encode_string(b"bob@x.com:secret1"));
        let response = send(&app, get_with("/profile", AUTHORIZATION, &good)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"email": "bob@x.com"}));

        let bad = format!("Basic {}", Base64::encode_string(b"bob@x.com:wrong"));
        let response = send(&app, get_with("/profile", AUTHORIZATION, &bad)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, Request::get("/profile").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let app = app(AuthType::Session);
        let response = send(&app, get_with("/", HeaderName::from_static("x-request-id"), "abc"))
            .await;
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn store_outage_is_internal_error() {
        let app = app_with_store(AuthType::Session, Arc::new(ScriptedStore::unavailable()));
        let credentials = "email=bob%40x.com&password=secret1";

        for uri in ["/users", "/sessions"] {
            let response = send(&app, form(Method::POST, uri, credentials)).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(
                json_body(response).await,
                json!({"error": "Internal Server Error"})
            );
        }

        let response = send(&app, get_with("/profile", COOKIE, "session_id=abc")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Internal Server Error"})
        );
    }
}
