pub mod logging;

use crate::auth::cookie::DEFAULT_SESSION_COOKIE;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const DEFAULT_EXCLUDED_PATHS: [&str; 5] =
    ["/", "/health/", "/openapi.json/", "/users/", "/sessions/"];

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("turnstile")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TURNSTILE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string, the in-memory store is used when omitted")
                .env("TURNSTILE_DSN"),
        )
        .arg(
            Arg::new("auth-type")
                .long("auth-type")
                .help("Request authentication strategy")
                .env("TURNSTILE_AUTH_TYPE")
                .default_value("session")
                .value_parser(["basic", "session"]),
        )
        .arg(
            Arg::new("excluded-paths")
                .long("excluded-paths")
                .help("Comma separated paths that skip authentication, slash terminated")
                .env("TURNSTILE_EXCLUDED_PATHS")
                .value_delimiter(',')
                .default_values(DEFAULT_EXCLUDED_PATHS),
        )
        .arg(
            Arg::new("session-cookie")
                .long("session-cookie")
                .help("Name of the session cookie")
                .env("TURNSTILE_SESSION_COOKIE")
                .default_value(DEFAULT_SESSION_COOKIE),
        )
        .arg(
            Arg::new("session-cookie-secure")
                .long("session-cookie-secure")
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("TURNSTILE_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        );

    logging::with_args(command)
}
