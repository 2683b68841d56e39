// src/config.rs
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set (put it in .env or the environment)")]
    MissingDatabaseUrl,
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime configuration, read once at startup from the environment
/// (after `dotenvy` has loaded `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Cadence of the background poller.
    pub poll_interval: Duration,
    /// How long a closing session waits for its poller to observe
    /// cancellation before giving up on the join.
    pub shutdown_grace: Duration,
    /// Where user.json and contacts.json live.
    pub data_dir: PathBuf,
    pub inbox_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let poll_interval =
            Duration::from_millis(env_u64("CATAPULT_POLL_INTERVAL_MS", 1000)?.max(100));
        let shutdown_grace = Duration::from_millis(env_u64("CATAPULT_SHUTDOWN_GRACE_MS", 2000)?);
        let inbox_limit = env_u64("CATAPULT_INBOX_LIMIT", 100)? as i64;

        let data_dir = match std::env::var("CATAPULT_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("catapult"),
        };

        Ok(Self {
            database_url,
            poll_interval,
            shutdown_grace,
            data_dir,
            inbox_limit,
        })
    }
}

fn env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
