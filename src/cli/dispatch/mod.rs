use crate::auth::AuthType;
use crate::cli::actions::{server::Args, Action};
use anyhow::{anyhow, Result};
use secrecy::SecretString;

fn many(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// # Errors
/// Returns an error if an argument holds a value the server cannot use.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let dsn = matches
        .get_one::<String>("dsn")
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| SecretString::from(dsn.clone()));

    let auth_type = matches
        .get_one::<String>("auth-type")
        .map_or(Ok(AuthType::Session), |value| value.parse::<AuthType>())
        .map_err(|e| anyhow!(e))?;

    let excluded_paths = many(matches, "excluded-paths")
        .into_iter()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect();

    let session_cookie = matches
        .get_one::<String>("session-cookie")
        .cloned()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| anyhow!("session cookie name must not be empty"))?;

    let session_cookie_secure = matches.get_flag("session-cookie-secure");

    Ok(Action::Server(Args {
        port,
        dsn,
        auth_type,
        excluded_paths,
        session_cookie,
        session_cookie_secure,
    }))
}
