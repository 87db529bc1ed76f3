//! Configuration for the sighting tracker
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/sighting-tracker/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod logging;
mod map;
mod serialization;


use logging::FileLogging;
use map::{FileDevice, FileMap};

pub use logging::{LogRotation, LoggingConfig};
pub use map::{DeviceConfig, MapConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_API_BASE: &str = "http://localhost:3000";
const DEFAULT_LATEST_PATH: &str = "/api/sightings/latest";
const DEFAULT_SUBMIT_PATH: &str = "/api/sightings";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 7;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sightings backend base URL
    pub api_base: String,

    /// Path of the latest-sighting resource
    pub latest_path: String,

    /// Path reports are posted to
    pub submit_path: String,

    /// Seconds between poll ticks
    pub poll_interval_secs: u64,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// Demo mode: scripted commands instead of stdin
    pub demo_mode: bool,

    /// Viewport and overlay parameters
    pub map: MapConfig,

    /// Stand-in device position
    pub device: DeviceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            latest_path: DEFAULT_LATEST_PATH.to_string(),
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            demo_mode: false,
            map: MapConfig::default(),
            device: DeviceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_base: Option<String>,
    pub latest_path: Option<String>,
    pub submit_path: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,

    /// Optional [map] section
    pub map: Option<FileMap>,

    /// Optional [device] section
    pub device: Option<FileDevice>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/sighting-tracker/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| {
            p.join(".config")
                .join("sighting-tracker")
                .join("config.toml")
        })
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        // Config is optional; a read-only home just means defaults
        if let Err(e) = Self::write_default(&path) {
            tracing::debug!("Skipping config template: {:#}", e);
        }
    }

    /// Write the default template to `path`, creating parent directories
    pub fn write_default(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        std::fs::write(path, Self::default().to_toml())
            .with_context(|| format!("Cannot write {}", path.display()))
    }

    /// Load file config if it exists
    ///
    /// Exits the process if the file exists but cannot be read or parsed:
    /// a broken config should not silently fall back to defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\nCONFIG ERROR - Failed to parse configuration file\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  To reset, run `sighting-tracker config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\nCONFIG ERROR - Cannot read configuration file\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        Self::resolve(Self::load_file_config(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            env(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        // API base: env > file > default
        let api_base = env("SIGHTING_API_BASE")
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let latest_path = file
            .latest_path
            .unwrap_or_else(|| DEFAULT_LATEST_PATH.to_string());
        let submit_path = file
            .submit_path
            .unwrap_or_else(|| DEFAULT_SUBMIT_PATH.to_string());

        // Poll interval: env > file > default; zero would spin, so floor at 1s
        let poll_interval_secs = env("SIGHTING_POLL_INTERVAL")
            .and_then(|v| v.parse().ok())
            .or(file.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);

        let request_timeout_secs = file
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            .max(1);

        // Demo mode: env only (runtime flag)
        let demo_mode = flag("SIGHTING_DEMO");

        let map = MapConfig::from_file(file.map);
        let logging = LoggingConfig::from_file(file.logging);

        // Device position: env pair overrides the file section
        let mut device = DeviceConfig::from_file(file.device);
        if let (Some(lat), Some(lng)) = (
            env("SIGHTING_DEVICE_LAT").and_then(|v| v.parse().ok()),
            env("SIGHTING_DEVICE_LNG").and_then(|v| v.parse().ok()),
        ) {
            device = DeviceConfig {
                lat: Some(lat),
                lng: Some(lng),
            };
        }

        Self {
            api_base,
            latest_path,
            submit_path,
            poll_interval_secs,
            request_timeout_secs,
            demo_mode,
            map,
            device,
            logging,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
