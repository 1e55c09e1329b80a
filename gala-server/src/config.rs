use std::env;

use axum::http::HeaderValue;
use thiserror::Error;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9000;

/// Where the database lives unless told otherwise
pub const DEFAULT_DATABASE_URL: &str = "sqlite://gala.db";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    /// The only origin browsers may call from. Any origin when unset.
    pub allowed_origin: Option<HeaderValue>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GALA_SERVER_PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    #[error("GALA_ALLOWED_ORIGIN is not a valid origin: {0:?}")]
    InvalidOrigin(String),
}

impl ServerConfig {
    /// Reads `GALA_SERVER_PORT`, `GALA_DATABASE_URL` and `GALA_ALLOWED_ORIGIN`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("GALA_SERVER_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_PORT,
        };

        let database_url = lookup("GALA_DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let allowed_origin = match lookup("GALA_ALLOWED_ORIGIN") {
            Some(origin) if !origin.trim().is_empty() => Some(
                HeaderValue::from_str(origin.trim())
                    .map_err(|_| ConfigError::InvalidOrigin(origin))?,
            ),
            _ => None,
        };

        Ok(Self {
            port,
            database_url,
            allowed_origin,
        })
    }
}
