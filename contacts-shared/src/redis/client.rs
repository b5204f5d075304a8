/// Redis client wrapper
///
/// Wraps `redis::aio::ConnectionManager`, which reconnects on its own after
/// a dropped connection. Clones share the same underlying connection.
///
/// # Example
///
/// ```no_run
/// use contacts_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Redis client errors
#[derive(Error, Debug)]
pub enum RedisClientError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command error: {0}")]
    CommandError(String),

    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    #[error("Redis operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            RedisClientError::ConnectionError(err.to_string())
        } else {
            RedisClientError::CommandError(err.to_string())
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `redis://[username:password@]host:port[/db]`
    pub url: String,

    /// Limit on establishing the initial connection
    pub connection_timeout: Duration,

    /// Limit on a single command round trip
    pub command_timeout: Duration,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// Shared Redis connection
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("url", &sanitize_url(&self.config.url))
            .finish()
    }
}

impl RedisClient {
    /// Opens the connection
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed URL, `ConnectionError` if the
    /// server refuses the connection, or `Timeout` if it does not answer
    /// within `connection_timeout`.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RedisClientError::Timeout(config.connection_timeout))?
            .map_err(|e| RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %sanitize_url(&config.url), "Redis client connected");

        Ok(Self {
            manager,
            config: Arc::new(config),
        })
    }

    /// Sends `PING` and reports whether `PONG` came back
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.get_connection();

        let reply: String = self.timed(redis::cmd("PING").query_async(&mut conn)).await?;

        Ok(reply == "PONG")
    }

    /// Runs a command future under `command_timeout`
    ///
    /// `ConnectionManager` has no response timeout of its own, so every
    /// command goes through here.
    pub async fn timed<T, F>(&self, command: F) -> Result<T, RedisClientError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        with_timeout(self.config.command_timeout, command).await
    }

    /// Returns a handle to the managed connection
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Awaits `command`, giving up with `Timeout` after `limit`
pub async fn with_timeout<T, F>(limit: Duration, command: F) -> Result<T, RedisClientError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    tokio::time::timeout(limit, command)
        .await
        .map_err(|_| RedisClientError::Timeout(limit))?
        .map_err(RedisClientError::from)
}

/// Masks credentials in a Redis URL for logging
pub fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
