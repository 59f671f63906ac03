use crate::{
    api,
    auth::{
        strategy, Argon2Hasher, AuthService, AuthType, CredentialStore, MemoryStore, PathPolicy,
        PgStore, SessionCookie,
    },
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub auth_type: AuthType,
    pub excluded_paths: Vec<String>,
    pub session_cookie: String,
    pub session_cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: Arc<dyn CredentialStore> = match &args.dsn {
        Some(dsn) => {
            let store = PgStore::connect(dsn.expose_secret()).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            warn!("No DSN configured, users and sessions are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let service = AuthService::build(store, Arc::new(Argon2Hasher::default()))
        .await
        .context("Failed to initialize auth service")?;

    let cookie = SessionCookie::new(args.session_cookie).with_secure(args.session_cookie_secure);
    let policy = PathPolicy::new(args.excluded_paths);
    let strategy = strategy::build(args.auth_type, service.clone(), policy, cookie.clone());

    api::serve(args.port, api::router(service, strategy, cookie)).await
}

fn log_startup_args(args: &Args) {
    let dsn = args
        .dsn
        .as_ref()
        .map_or_else(|| "memory".to_string(), |dsn| mask_dsn(dsn.expose_secret()));

    info!(
        port = args.port,
        dsn = %dsn,
        auth_type = %args.auth_type,
        "Starting server"
    );
    debug!(
        excluded_paths = ?args.excluded_paths,
        session_cookie = %args.session_cookie,
        session_cookie_secure = args.session_cookie_secure,
        "Auth settings"
    );
}

/// Replace the password of a connection string with `***`.
fn mask_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "***".to_string();
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
