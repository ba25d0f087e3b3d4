//! Connection pool configuration.

use std::{fmt, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

const DATABASE_URL: &str = "DATABASE_URL";
const MAX_CONNECTIONS: &str = "VELLUM_MAX_CONNECTIONS";
const ACQUIRE_TIMEOUT_MS: &str = "VELLUM_ACQUIRE_TIMEOUT_MS";

/// Error building a configuration or connecting with it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Settings for the connection pool shared by the commit and snapshot stores.
#[derive(Clone)]
pub struct Config {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl fmt::Debug for Config {
    // The URL usually carries credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Configuration for `url` with default pool settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Read the configuration from the environment.
    ///
    /// `DATABASE_URL` is required. `VELLUM_MAX_CONNECTIONS` and
    /// `VELLUM_ACQUIRE_TIMEOUT_MS` override the pool defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `DATABASE_URL` is unset and
    /// [`ConfigError::Invalid`] if an override is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(DATABASE_URL).ok_or(ConfigError::Missing(DATABASE_URL))?;
        let mut config = Self::new(url);

        if let Some(value) = lookup(MAX_CONNECTIONS) {
            config.max_connections = parse(MAX_CONNECTIONS, value)?;
        }
        if let Some(value) = lookup(ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout = Duration::from_millis(parse(ACQUIRE_TIMEOUT_MS, value)?);
        }
        Ok(config)
    }

    /// Pool options derived from this configuration.
    #[must_use]
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }

    /// Build a pool without opening a connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Connect`] if the URL cannot be parsed.
    pub fn connect_lazy(&self) -> Result<PgPool, ConfigError> {
        Ok(self.pool_options().connect_lazy(&self.url)?)
    }

    /// Build a pool and verify the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Connect`] if no connection can be established.
    #[tracing::instrument(skip(self), fields(max_connections = self.max_connections))]
    pub async fn connect(&self) -> Result<PgPool, ConfigError> {
        let pool = self.pool_options().connect(&self.url).await?;
        tracing::debug!("database connection established");
        Ok(pool)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
