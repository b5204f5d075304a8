/// Configuration management for the API server
///
/// Configuration is read once at startup into a [`Config`] value and handed
/// to [`AppState`](crate::app::AppState). Nothing reads the environment
/// after that.
///
/// # Environment Variables
///
/// Server:
/// - `API_HOST` (default `0.0.0.0`), `API_PORT` (default `8000`)
/// - `API_PUBLIC_URL`: base for links in outgoing email (default `http://localhost:8000`)
/// - `CORS_ORIGINS`: comma-separated, `*` for any (default `*`)
/// - `PRODUCTION`: enables HSTS (default `false`)
///
/// Database and cache:
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS` (default `10`)
/// - `REDIS_URL`: optional; rate limiting is off without it
///
/// Tokens:
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `JWT_ALGORITHM` (default `HS256`)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default `30`)
///
/// Mail:
/// - `MAIL_SERVER` (default `localhost`), `MAIL_PORT` (default `587`)
/// - `MAIL_USERNAME`, `MAIL_PASSWORD` (no authentication when empty)
/// - `MAIL_FROM` (default `noreply@localhost`), `MAIL_FROM_NAME` (default `Contacts API`)
/// - `MAIL_STARTTLS` (default `true`), `MAIL_SSL_TLS` (default `false`)
///
/// Avatars:
/// - `CLOUDINARY_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
///
/// # Example
///
/// ```no_run
/// use contacts_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use contacts_shared::auth::jwt::{JwtKeys, TokenError};
use contacts_shared::services::avatar::CloudinaryConfig;
use contacts_shared::services::email::SmtpConfig;
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Redis URL for rate limiting, if any
    pub redis_url: Option<String>,

    pub mail: SmtpConfig,
    pub cloudinary: CloudinaryConfig,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Externally reachable base URL
    pub public_url: String,

    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Token signing settings
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret, at least 32 characters
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub algorithm: String,
    pub access_token_expire_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .finish()
    }
}

/// One year
const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

impl Config {
    /// Loads configuration from the process environment, after `.env`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} environment variable is required", key))
        };

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let config = Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse(&lookup, "API_PORT", 8000)?,
                public_url: var("API_PUBLIC_URL", "http://localhost:8000"),
                cors_origins: var("CORS_ORIGINS", "*")
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
                production: parse_bool(&lookup, "PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                algorithm: var("JWT_ALGORITHM", "HS256"),
                access_token_expire_minutes: parse(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            },
            redis_url: lookup("REDIS_URL").filter(|v| !v.is_empty()),
            mail: SmtpConfig {
                server: var("MAIL_SERVER", "localhost"),
                port: parse(&lookup, "MAIL_PORT", 587)?,
                username: var("MAIL_USERNAME", ""),
                password: var("MAIL_PASSWORD", ""),
                from_address: var("MAIL_FROM", "noreply@localhost"),
                from_name: var("MAIL_FROM_NAME", "Contacts API"),
                starttls: parse_bool(&lookup, "MAIL_STARTTLS", true)?,
                ssl_tls: parse_bool(&lookup, "MAIL_SSL_TLS", false)?,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: var("CLOUDINARY_NAME", ""),
                api_key: var("CLOUDINARY_API_KEY", ""),
                api_secret: var("CLOUDINARY_API_SECRET", ""),
            },
        };

        config.jwt_keys().context("Invalid JWT_ALGORITHM")?;

        let minutes = config.jwt.access_token_expire_minutes;
        if !(1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(&minutes) {
            anyhow::bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}, got {}",
                MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
                minutes
            );
        }

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds token signing keys from the JWT settings
    pub fn jwt_keys(&self) -> Result<JwtKeys, TokenError> {
        JwtKeys::new(self.jwt.secret.clone(), &self.jwt.algorithm)
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> anyhow::Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off" | "") => Ok(false),
        Some(v) => anyhow::bail!("Invalid boolean for {}: {:?}", key, v),
    }
}
