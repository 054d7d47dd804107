use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The minimum length of the JWT signing secret in bytes.
const MIN_SECRET_LEN: usize = 32;
/// The longest accepted session and cookie lifetime, in days.
const MAX_LIFETIME_DAYS: i64 = 3650;
/// The longest accepted reset token lifetime, in minutes.
const MAX_RESET_TTL_MINUTES: i64 = 1440;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The secret used to sign session tokens.
    pub jwt_secret: Zeroizing<String>,
    /// How long a session token stays valid, in days.
    pub jwt_expires_in_days: i64,
    /// How long the `jwt` cookie lives in the browser, in days.
    pub jwt_cookie_expires_in_days: i64,
    /// How long a password reset token stays valid, in minutes.
    pub reset_token_ttl_minutes: i64,
    /// The URL of the PostgreSQL database. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// The public base URL used to build reset links.
    pub public_url: String,
    /// The address the server binds to.
    pub bind_addr: SocketAddr,
    /// Whether cookies must be marked `Secure`.
    pub secure_cookies: bool,
    /// How many API requests a single IP may make per hour.
    pub rate_limit_per_hour: u32,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = Zeroizing::new(
            env::var("JWT_SECRET")
                .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?,
        );

        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} bytes long", MIN_SECRET_LEN);
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            jwt_secret,
            jwt_expires_in_days: lifetime_var("JWT_EXPIRES_IN_DAYS", 90, MAX_LIFETIME_DAYS)?,
            jwt_cookie_expires_in_days: lifetime_var("JWT_COOKIE_EXPIRES_IN_DAYS", 90, MAX_LIFETIME_DAYS)?,
            reset_token_ttl_minutes: lifetime_var("RESET_TOKEN_TTL_MINUTES", 10, MAX_RESET_TTL_MINUTES)?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            secure_cookies: app_env == "production",
            rate_limit_per_hour: env::var("RATE_LIMIT_PER_HOUR")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_PER_HOUR")?,
        })
    }

    /// A configuration suitable for tests and local tooling.
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: Zeroizing::new(
                "test-secret-key-must-be-at-least-32-characters-long!".to_string(),
            ),
            jwt_expires_in_days: 90,
            jwt_cookie_expires_in_days: 90,
            reset_token_ttl_minutes: 10,
            database_url: None,
            public_url: "http://127.0.0.1:3000".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            secure_cookies: false,
            rate_limit_per_hour: 100,
        }
    }
}

/// Reads a positive lifetime from the environment, falling back to `default`.
fn lifetime_var(name: &str, default: i64, max: i64) -> Result<i64> {
    let value = match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name))?,
        Err(_) => default,
    };

    check_lifetime(name, value, max)
}

fn check_lifetime(name: &str, value: i64, max: i64) -> Result<i64> {
    if !(1..=max).contains(&value) {
        anyhow::bail!("{} must be between 1 and {}, got {}", name, max, value);
    }

    Ok(value)
}
