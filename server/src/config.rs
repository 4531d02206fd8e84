// storefront_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  pub db_max_connections: u32,
  pub db_acquire_timeout: Duration,

  /// Upper bound on any single row-lock wait.
  pub lock_timeout: Duration,

  /// Insert the demo catalog on startup when the stocks table is empty.
  pub seed_db: bool,

  /// `LOG_FORMAT=json` switches the subscriber to JSON lines.
  pub log_json: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the
  /// process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    fn parse_or<T>(raw: Option<String>, var_name: &str, default: T) -> Result<T>
    where
      T: FromStr,
      T::Err: Display,
    {
      match raw {
        None => Ok(default),
        Some(value) => value
          .trim()
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, value, e))),
      }
    }

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(lookup("SERVER_PORT"), "SERVER_PORT", 8080u16)?;
    let database_url = get_env("DATABASE_URL")?;

    let db_max_connections = parse_or(lookup("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10u32)?;
    if db_max_connections == 0 {
      return Err(AppError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
    }
    let db_acquire_timeout = Duration::from_secs(parse_or(
      lookup("DB_ACQUIRE_TIMEOUT_SECS"),
      "DB_ACQUIRE_TIMEOUT_SECS",
      5u64,
    )?);

    let lock_timeout_ms = parse_or(lookup("LOCK_TIMEOUT_MS"), "LOCK_TIMEOUT_MS", 5_000u64)?;
    if lock_timeout_ms == 0 {
      return Err(AppError::Config("LOCK_TIMEOUT_MS must be at least 1".to_string()));
    }

    let seed_db = parse_or(lookup("SEED_DB"), "SEED_DB", false)?;

    let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
      None | Some("") | Some("text") => false,
      Some("json") => true,
      Some(other) => {
        return Err(AppError::Config(format!(
          "Invalid LOG_FORMAT value '{}': expected 'text' or 'json'",
          other
        )))
      }
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      db_acquire_timeout,
      lock_timeout: Duration::from_millis(lock_timeout_ms),
      seed_db,
      log_json,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
