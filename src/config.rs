//! Runtime configuration for Lyceum
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`, default `lyceum.toml` in the working directory)
//! 3. Environment variables prefixed `LYCEUM__`, with `__` separating sections
//!    (e.g. `LYCEUM__SERVER__ADDR=0.0.0.0:8080`)

use crate::error::{LyceumError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "LYCEUM";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LyceumConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub analytics: AnalyticsConfig,
    pub grading: GradingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `:memory:` for an ephemeral store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Event channel capacity
    pub event_capacity: usize,
    /// Seconds between heartbeat events on the SSE stream
    pub heartbeat_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            event_capacity: 1000,
            heartbeat_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key for session token digests; generated per process when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,
    pub session_ttl_hours: i64,
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_hours: 24 * 7,
            password_iterations: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Lifetime of cached analytics results
    pub cache_ttl_secs: u64,
    /// Maximum number of cached analytics results
    pub cache_capacity: usize,
    pub leaderboard_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            cache_capacity: 512,
            leaderboard_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Pass mark for quizzes that do not set their own
    pub default_passing_score: u8,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            default_passing_score: crate::grading::DEFAULT_PASSING_SCORE,
        }
    }
}

/// Get the default database path using XDG_DATA_HOME standard
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lyceum")
        .join("lyceum.db")
}

impl LyceumConfig {
    /// Load defaults, then `path` (if it exists), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&LyceumConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("lyceum.toml"));
        if file.exists() {
            debug!("Loading configuration from {}", file.display());
            builder = builder.add_source(config::File::from(file.as_path()).required(true));
        } else if path.is_some() {
            return Err(LyceumError::Validation(format!(
                "config file not found: {}",
                file.display()
            )));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: LyceumConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the server misbehave
    pub fn validate(&self) -> Result<()> {
        if self.server.event_capacity == 0 {
            return Err(LyceumError::Validation(
                "server.event_capacity must be positive".to_string(),
            ));
        }
        if self.grading.default_passing_score > 100 {
            return Err(LyceumError::Validation(
                "grading.default_passing_score must be at most 100".to_string(),
            ));
        }
        if self.auth.password_iterations == 0 {
            return Err(LyceumError::Validation(
                "auth.password_iterations must be positive".to_string(),
            ));
        }
        if let Some(secret) = &self.auth.session_secret {
            if secret.len() < 16 {
                return Err(LyceumError::Validation(
                    "auth.session_secret must be at least 16 bytes".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Effective database path
    pub fn db_path(&self) -> String {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| default_db_path().to_string_lossy().to_string())
    }

    /// Session secret, generating an ephemeral one if none is configured
    pub fn session_secret(&self) -> String {
        match &self.auth.session_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("auth.session_secret not set; sessions will not survive a restart");
                crate::auth::generate_secret()
            }
        }
    }

    /// Render as TOML (secrets redacted)
    pub fn to_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.auth.session_secret.is_some() {
            redacted.auth.session_secret = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&redacted).map_err(|e| LyceumError::Other(e.to_string()))
    }
}
