// API server configuration
//
// Everything comes from environment variables (optionally via .env).
// Data layout under WEBFORGE_DATA_DIR:
//   projects/      generated and user projects
//   models/        uploaded model files
//   config.json    active model
//   webforge.db    chat transcripts

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8004";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub database_url: String,
    /// Empty means same-origin only
    pub cors_allowed_origins: Vec<HeaderValue>,
    pub max_upload_bytes: u64,
    /// How long finished build sessions stay available for replay
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    /// Close a build stream after this long without an event
    pub stream_idle_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: default_database_url(&data_dir),
            data_dir,
            cors_allowed_origins: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            stream_idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("WEBFORGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_database_url(&data_dir));

        // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: std::env::var("WEBFORGE_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            data_dir,
            database_url,
            cors_allowed_origins,
            max_upload_bytes: env_u64("WEBFORGE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session_ttl: Duration::from_secs(env_u64(
                "WEBFORGE_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            sweep_interval: env_positive_secs(
                "WEBFORGE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            stream_idle_timeout: env_positive_secs(
                "WEBFORGE_STREAM_IDLE_TIMEOUT_SECS",
                DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

fn default_database_url(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}", data_dir.join("webforge.db").display())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer")),
        _ => Ok(default),
    }
}

/// Seconds that must be at least 1
fn env_positive_secs(name: &str, default: u64) -> Result<Duration> {
    match env_u64(name, default)? {
        0 => anyhow::bail!("{name} must be greater than zero"),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8004");
        assert_eq!(config.projects_dir(), PathBuf::from("data/projects"));
        assert_eq!(config.models_dir(), PathBuf::from("data/models"));
        assert_eq!(config.settings_path(), PathBuf::from("data/config.json"));
        assert_eq!(config.database_url, "sqlite://data/webforge.db");
        assert_eq!(config.max_upload_bytes, 4 * 1024 * 1024 * 1024);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_env_u64_default_when_unset() {
        assert_eq!(env_u64("WEBFORGE_TEST_UNSET_VARIABLE", 7).unwrap(), 7);
    }

    #[test]
    fn test_env_positive_secs_rejects_zero() {
        std::env::set_var("WEBFORGE_TEST_ZERO_SECS", "0");
        let err = env_positive_secs("WEBFORGE_TEST_ZERO_SECS", 60).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        std::env::set_var("WEBFORGE_TEST_ZERO_SECS", "5");
        assert_eq!(
            env_positive_secs("WEBFORGE_TEST_ZERO_SECS", 60).unwrap(),
            Duration::from_secs(5)
        );
        std::env::remove_var("WEBFORGE_TEST_ZERO_SECS");
    }

    // Both variables are checked in one test so parallel tests never see each other's values
    #[test]
    fn test_from_env_rejects_zero_sweep_interval_and_idle_timeout() {
        std::env::set_var("WEBFORGE_SWEEP_INTERVAL_SECS", "0");
        let err = ApiConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("WEBFORGE_SWEEP_INTERVAL_SECS"));
        std::env::remove_var("WEBFORGE_SWEEP_INTERVAL_SECS");

        std::env::set_var("WEBFORGE_STREAM_IDLE_TIMEOUT_SECS", "0");
        let err = ApiConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("WEBFORGE_STREAM_IDLE_TIMEOUT_SECS"));
        std::env::remove_var("WEBFORGE_STREAM_IDLE_TIMEOUT_SECS");

        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(600));
    }
}
