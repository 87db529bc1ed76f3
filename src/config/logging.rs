//! `[logging]` section: filter level and the optional JSON log file

use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// Single file, appended across runs
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for this crate's targets when RUST_LOG is unset
    pub level: String,
    /// Write JSON lines to `file_dir` alongside stderr
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// File names are `<prefix>.<date>` (or just `<prefix>` with `never`)
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<PathBuf>,
    pub file_rotation: Option<LogRotation>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let FileLogging {
            level,
            file_enabled,
            file_dir,
            file_rotation,
            file_prefix,
        } = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: level.unwrap_or(defaults.level),
            file_enabled: file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file_dir.unwrap_or(defaults.file_dir),
            file_rotation: file_rotation.unwrap_or(defaults.file_rotation),
            file_prefix: file_prefix.unwrap_or(defaults.file_prefix),
        }
    }

    /// EnvFilter directive scoping `level` to this crate
    pub fn filter_directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.level)
    }

    /// Rolling appender for the JSON log file; creates `file_dir` if needed
    pub fn file_appender(&self) -> Result<RollingFileAppender, InitError> {
        RollingFileAppender::builder()
            .rotation(self.file_rotation.into())
            .filename_prefix(&self.file_prefix)
            .build(&self.file_dir)
    }
}
