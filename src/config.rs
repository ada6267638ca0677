use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value}")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// When unset the server keeps its data in memory.
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bind_address: String,
    pub frontend_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::NotANumber {
                name: "TOKEN_TTL_HOURS",
                value,
            })?,
            Err(_) => 24,
        };

        Ok(Self {
            mongo_uri: env::var("MONGO_URI").ok().filter(|uri| !uri.is_empty()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "softdesk".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            token_ttl_hours,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            mongo_uri: None,
            database_name: "softdesk_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bind_address: "127.0.0.1:0".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }
}
