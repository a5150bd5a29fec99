//! Process configuration read from the environment (and `.env` via dotenvy).

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    /// Card payments are offered only when this is set.
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub nats_url: Option<String>,
    pub production: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => 8083,
        };
        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "DATABASE_MAX_CONNECTIONS", value: v })?,
            None => 10,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            port,
            jwt_secret: required("JWT_SECRET")?,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_api_base: get("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string()),
            nats_url: get("NATS_URL"),
            production: get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
        })
    }

    pub fn card_payments_enabled(&self) -> bool { self.stripe_secret_key.is_some() }
}
