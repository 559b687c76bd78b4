//! Configuration management for RAX Share Server
//!
//! Loads `config.toml` (optional) layered with `RAX_SHARE_*` environment
//! variables. Nested tables are addressed with `__`, for example
//! `RAX_SHARE_CACHE__BACKEND=remote`. Every value has a default.

use crate::cache::sweeper::DEFAULT_SWEEP_INTERVAL;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: StartupConfig,
    pub cache: CacheConfig,
    pub tokens: TokenConfig,
    pub auth: AuthConfig,
}

/// Network and storage settings, fixed for the life of the process
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StartupConfig {
    /// IP address to bind the control listener
    pub bind_address: String,

    /// Port for the control listener
    pub control_port: u16,

    /// Base directory holding every principal's storage root
    pub storage_root: String,

    /// Public prefix for share links
    pub base_url: String,

    /// Maximum concurrent sessions
    pub max_clients: usize,

    /// Maximum command line length in bytes
    pub max_command_length: usize,

    /// Maximum upload size in MB
    pub max_file_size_mb: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            storage_root: "./server_root".to_string(),
            base_url: "http://localhost:8080/api/v1".to_string(),
            max_clients: 64,
            max_command_length: 512,
            max_file_size_mb: 100,
        }
    }
}

/// Which cache backend to build at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,

    /// `host:port` of the RESP server, remote backend only
    pub remote_address: String,

    /// Bound on every remote call
    pub io_timeout_ms: u64,

    /// Period of the in-memory sweeper
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            remote_address: "127.0.0.1:6379".to_string(),
            io_timeout_ms: 2_000,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

/// Lifetimes of one-time codes and share links
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TokenConfig {
    pub otp_ttl_secs: u64,
    pub share_ttl_days: u32,
    pub max_share_ttl_days: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            otp_ttl_secs: 60,
            share_ttl_days: 7,
            max_share_ttl_days: 30,
        }
    }
}

/// Bearer token signing and login throttling
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub signing_key: String,
    pub access_token_ttl_secs: u64,

    /// OTP requests allowed per phone number within the window
    pub otp_max_requests: usize,

    /// Wrong codes allowed per phone number within the window
    pub otp_max_attempts: usize,
    pub otp_window_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: "change-me-change-me-change-me-change-me".to_string(),
            access_token_ttl_secs: 3600,
            otp_max_requests: 5,
            otp_max_attempts: 5,
            otp_window_secs: 15 * 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Production layout first, then the working directory
        let config_paths = ["rax-share-server/config", "config"];

        let mut builder = Config::builder();
        for config_path in config_paths {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("RAX_SHARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.control_port == 0 {
            return Err(config::ConfigError::Message(
                "Control port cannot be 0".into(),
            ));
        }

        if self.server.storage_root.is_empty() {
            return Err(config::ConfigError::Message(
                "storage_root cannot be empty".into(),
            ));
        }

        if self.server.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.server.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.cache.backend == CacheBackendKind::Remote && self.cache.remote_address.is_empty()
        {
            return Err(config::ConfigError::Message(
                "remote_address is required for the remote cache backend".into(),
            ));
        }

        if self.cache.io_timeout_ms == 0 {
            return Err(config::ConfigError::Message(
                "io_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }

        if self.tokens.otp_ttl_secs == 0 {
            return Err(config::ConfigError::Message(
                "otp_ttl_secs must be greater than 0".into(),
            ));
        }

        if self.tokens.max_share_ttl_days == 0
            || self.tokens.share_ttl_days == 0
            || self.tokens.share_ttl_days > self.tokens.max_share_ttl_days
        {
            return Err(config::ConfigError::Message(
                "share_ttl_days must be between 1 and max_share_ttl_days".into(),
            ));
        }

        if self.auth.signing_key.len() < 32 {
            return Err(config::ConfigError::Message(
                "signing_key must be at least 32 bytes".into(),
            ));
        }

        if self.auth.otp_max_requests == 0
            || self.auth.otp_max_attempts == 0
            || self.auth.otp_window_secs == 0
        {
            return Err(config::ConfigError::Message(
                "otp_max_requests, otp_max_attempts and otp_window_secs must be greater than 0"
                    .into(),
            ));
        }

        if self.auth.access_token_ttl_secs == 0 {
            return Err(config::ConfigError::Message(
                "access_token_ttl_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl CacheConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl TokenConfig {
    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn otp_window(&self) -> Duration {
        Duration::from_secs(self.otp_window_secs)
    }
}
