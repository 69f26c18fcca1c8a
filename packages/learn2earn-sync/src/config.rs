use anyhow::{Context, Result};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::domains::learn2earn::CompletionPolicy;

/// Daily at midnight (sec min hour day month weekday).
pub const DEFAULT_SYNC_SCHEDULE: &str = "0 0 0 * * *";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub sync: SyncConfig,
}

/// Settings for the scheduled status sync
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub schedule: String,
    pub timezone: Tz,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub completion_policy: CompletionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SYNC_SCHEDULE.to_string(),
            timezone: Tz::UTC,
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
            completion_policy: CompletionPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            sync: SyncConfig::from_env()?,
        })
    }
}

impl SyncConfig {
    /// Load sync settings, falling back to the defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let timezone = match env::var("SYNC_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("SYNC_TIMEZONE is not a valid time zone: {}", e))?,
            Err(_) => defaults.timezone,
        };

        let max_attempts: u32 = match env::var("SYNC_MAX_ATTEMPTS") {
            Ok(v) => v
                .parse::<u32>()
                .context("SYNC_MAX_ATTEMPTS must be a valid number")?,
            Err(_) => defaults.max_attempts,
        };
        if max_attempts == 0 {
            anyhow::bail!("SYNC_MAX_ATTEMPTS must be at least 1");
        }

        let retry_delay = match env::var("SYNC_RETRY_DELAY_SECS") {
            Ok(v) => Duration::from_secs(
                v.parse::<u64>()
                    .context("SYNC_RETRY_DELAY_SECS must be a valid number")?,
            ),
            Err(_) => defaults.retry_delay,
        };

        let completion_policy = match env::var("SYNC_COMPLETION_POLICY") {
            Ok(v) => v
                .parse::<CompletionPolicy>()
                .context("SYNC_COMPLETION_POLICY is invalid")?,
            Err(_) => defaults.completion_policy,
        };

        Ok(Self {
            schedule: env::var("SYNC_SCHEDULE").unwrap_or(defaults.schedule),
            timezone,
            max_attempts,
            retry_delay,
            completion_policy,
        })
    }
}
