use std::env;

use crate::error::{AppError, Result};

const DEFAULT_DATABASE: &str = "PartySplit";
const DEFAULT_COLLECTION: &str = "Parties";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Without a URI parties are kept in memory only.
    pub mongodb_uri: Option<String>,
    pub database: String,
    pub collection: String,
    pub bind_address: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a port number, got {port}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            mongodb_uri: var("MONGODB_URI"),
            database: var("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            collection: var("PARTY_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port,
        })
    }
}
