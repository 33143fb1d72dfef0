//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_WORKOUTS: &str = "cardio,strength,yoga,hiit,running,cycling,stretching,dance";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend_url: String,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub oauth_redirect_uri: String,
    pub artist_cache_ttl: chrono::Duration,
    pub preload_delay: Duration,
    pub artist_display_count: usize,
    pub swipe_threshold: f32,
    pub default_mood: String,
    pub workouts: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Server and Backend Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "127.0.0.1:8787");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let backend_url = lookup("BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| ConfigError::MissingVar("BACKEND_URL".to_string()))?;

        let database_url = var_or("DATABASE_URL", "sqlite://discovery.db?mode=rwc");

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");
        let oauth_redirect_uri = var_or("OAUTH_REDIRECT_URI", "http://localhost:3000/callback");

        // --- Discovery Tuning ---
        let ttl_secs: i64 = parse_var(&lookup, "ARTIST_CACHE_TTL_SECS", 30 * 60)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "ARTIST_CACHE_TTL_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let preload_delay_ms: u64 = parse_var(&lookup, "PRELOAD_DELAY_MS", 1500)?;
        let artist_display_count: usize = parse_var(&lookup, "ARTIST_DISPLAY_COUNT", 10)?;
        let swipe_threshold: f32 = parse_var(&lookup, "SWIPE_THRESHOLD", 300.0)?;
        if !swipe_threshold.is_finite() || swipe_threshold < 0.0 {
            return Err(ConfigError::InvalidValue(
                "SWIPE_THRESHOLD".to_string(),
                format!("'{}' is not a non-negative number", swipe_threshold),
            ));
        }

        let default_mood = var_or("DEFAULT_MOOD", "energetic");
        let workouts: Vec<String> = var_or("WORKOUTS", DEFAULT_WORKOUTS)
            .split(',')
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if workouts.is_empty() {
            return Err(ConfigError::InvalidValue(
                "WORKOUTS".to_string(),
                "at least one workout is required".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            backend_url,
            database_url,
            log_level,
            cors_origin,
            oauth_redirect_uri,
            artist_cache_ttl: chrono::Duration::seconds(ttl_secs),
            preload_delay: Duration::from_millis(preload_delay_ms),
            artist_display_count,
            swipe_threshold,
            default_mood,
            workouts,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
