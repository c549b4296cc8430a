//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Rate-limit action name for the ingest endpoint.
pub const INGEST_ACTION: &str = "ingest_update";

/// Default ingest budget per client IP per second.
pub const DEFAULT_INGEST_RATE_LIMIT: u32 = 3;

/// Default offline sweep period (15 minutes).
pub const DEFAULT_OFFLINE_CHECK_INTERVAL_SECS: u64 = 15 * 60;

/// Default silence window before an account is marked offline (30 minutes).
pub const DEFAULT_OFFLINE_THRESHOLD_SECS: u64 = 30 * 60;

/// Where accounts, fences and updates are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Public API URL, allowed as a CORS origin
    pub base_api_url: String,
    pub storage_backend: StorageBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// Telegram bot token; alerts are only logged when unset
    pub telegram_bot_token: Option<String>,
    /// Take the client IP from the first `X-Forwarded-For` hop
    pub trust_forwarded_for: bool,
    /// Ingest requests allowed per client IP per second
    pub ingest_rate_limit: u32,
    pub offline_check_interval: Duration,
    pub offline_threshold: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StorageBackend::Firestore,
        };

        let gcp_project_id = match (storage_backend, env::var("GCP_PROJECT_ID")) {
            (_, Ok(id)) => id,
            (StorageBackend::Memory, Err(_)) => "local-dev".to_string(),
            (StorageBackend::Firestore, Err(_)) => {
                return Err(ConfigError::Missing("GCP_PROJECT_ID"))
            }
        };

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            base_api_url: env::var("BASE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            storage_backend,
            gcp_project_id,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            trust_forwarded_for: parse_or("TRUST_FORWARDED_FOR", true)?,
            ingest_rate_limit: parse_or("INGEST_RATE_LIMIT", DEFAULT_INGEST_RATE_LIMIT)?,
            offline_check_interval: Duration::from_secs(parse_or(
                "OFFLINE_CHECK_INTERVAL_SECS",
                DEFAULT_OFFLINE_CHECK_INTERVAL_SECS,
            )?),
            offline_threshold: Duration::from_secs(parse_or(
                "OFFLINE_THRESHOLD_SECS",
                DEFAULT_OFFLINE_THRESHOLD_SECS,
            )?),
        })
    }

    /// Deterministic configuration for tests (in-memory storage, no Telegram).
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            base_api_url: "http://localhost:8080".to_string(),
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            telegram_bot_token: None,
            trust_forwarded_for: true,
            ingest_rate_limit: DEFAULT_INGEST_RATE_LIMIT,
            offline_check_interval: Duration::from_secs(DEFAULT_OFFLINE_CHECK_INTERVAL_SECS),
            offline_threshold: Duration::from_secs(DEFAULT_OFFLINE_THRESHOLD_SECS),
        }
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
