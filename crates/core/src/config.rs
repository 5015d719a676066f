//! Driver Configuration
//!
//! Manages all allocation settings including:
//! - Boot polling and reservation retries
//! - Instance naming
//! - Android SDK paths
//! - Logging

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{CoreError, Result};

/// Instance allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AllocationConfig {
    /// Delay between two instance state polls while waiting for boot
    pub boot_poll_interval_ms: u64,
    /// Number of polls before giving up on a booting instance
    pub boot_poll_attempts: u32,
    /// Attempts at reserving an instance when another worker wins the race
    pub reservation_attempts: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            boot_poll_interval_ms: 5000,
            boot_poll_attempts: 25,
            reservation_attempts: 3,
        }
    }
}

/// Instance naming configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NamingConfig {
    /// Prefix shared by every instance this tool starts
    pub prefix: String,
    /// Session identifier; a random one is generated when unset
    pub session_id: Option<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefix: "cloudroid".to_string(),
            session_id: None,
        }
    }
}

/// Android SDK configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AndroidConfig {
    /// Path to Android SDK
    pub sdk_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Include the event target
    pub with_target: bool,
    /// Include source file and line
    pub with_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
            with_file: true,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FarmConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Allocation settings
    pub allocation: AllocationConfig,
    /// Naming settings
    pub naming: NamingConfig,
    /// Android SDK settings
    pub android: AndroidConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            version: 1,
            allocation: AllocationConfig::default(),
            naming: NamingConfig::default(),
            android: AndroidConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl FarmConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "cloudroid", "Cloudroid")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the platform config directory
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| CoreError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from a file, writing defaults if it does not exist
    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            let config: FarmConfig = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            info!("Config file not found, using defaults");
            let config = FarmConfig::default();
            config.save_to(path).await?;
            Ok(config)
        }
    }

    /// Save configuration to the platform config directory
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| CoreError::Config("Cannot determine config path".into()))?;
        self.save_to(&config_file).await
    }

    /// Save configuration to a file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Reject settings the allocator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.allocation.boot_poll_interval_ms == 0 {
            return Err(CoreError::Config("allocation.boot_poll_interval_ms must be positive".into()));
        }
        if self.allocation.boot_poll_attempts == 0 {
            return Err(CoreError::Config("allocation.boot_poll_attempts must be positive".into()));
        }
        if self.allocation.reservation_attempts == 0 {
            return Err(CoreError::Config("allocation.reservation_attempts must be positive".into()));
        }
        if self.naming.prefix.trim().is_empty() {
            return Err(CoreError::Config("naming.prefix must not be empty".into()));
        }
        if self.naming.prefix.contains('.') {
            return Err(CoreError::Config("naming.prefix must not contain '.'".into()));
        }
        Ok(())
    }

    /// Get Android SDK path, with auto-detection
    pub fn get_sdk_path(&self) -> Option<PathBuf> {
        self.android.sdk_path.clone().or_else(|| {
            ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
                .iter()
                .filter_map(|var| std::env::var_os(var))
                .map(PathBuf::from)
                .find(|p| p.exists())
        })
    }
}
