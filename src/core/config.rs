//! Environment-driven configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context, Result};
use std::env;

use crate::features::reminders::DEFAULT_TIME_ZONE;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,
    /// Path to the sqlite database file
    pub database_path: String,
    /// Prefix that marks a message as a command
    pub command_prefix: String,
    /// IANA time zone assigned to chats on first contact
    pub default_time_zone: String,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `DISCORD_TOKEN` is required; everything else falls back to a
    /// default. `DEFAULT_TIME_ZONE` must name a valid IANA zone.
    pub fn from_env() -> Result<Self> {
        let discord_token =
            env::var("DISCORD_TOKEN").context("DISCORD_TOKEN environment variable is required")?;

        let default_time_zone =
            env::var("DEFAULT_TIME_ZONE").unwrap_or_else(|_| DEFAULT_TIME_ZONE.to_string());
        default_time_zone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("DEFAULT_TIME_ZONE is not a valid IANA zone: {default_time_zone}"))?;

        Ok(Config {
            discord_token,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/chats.db".to_string()),
            command_prefix: env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),
            default_time_zone,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
