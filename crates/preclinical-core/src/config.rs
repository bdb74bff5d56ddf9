//! Runtime configuration, read from the environment (and `.env` if present).

use std::env;

use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "preclinical.db";
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file; `:memory:` opens an in-memory database
    pub database_path: String,
    /// Currency used when a procedure definition omits one
    pub default_currency: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DB_PATH.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl CoreConfig {
    /// Load from `PRECLINICAL_DB_PATH` and `PRECLINICAL_DEFAULT_CURRENCY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load from .env file if available
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("PRECLINICAL_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let default_currency = match lookup("PRECLINICAL_DEFAULT_CURRENCY") {
            Some(raw) => normalize_currency(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "PRECLINICAL_DEFAULT_CURRENCY",
                message: format!("'{raw}' is not a three-letter currency code"),
            })?,
            None => DEFAULT_CURRENCY.to_string(),
        };

        Ok(Self {
            database_path,
            default_currency,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == ":memory:"
    }
}

fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}
