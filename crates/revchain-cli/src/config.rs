//! Settings layering
//!
//! Each setting comes from the first of: command-line flag, environment
//! variable (both handled by clap), `revchain.toml`, built-in default.

use anyhow::Context;
use clap::ValueEnum;
use revchain_core::logging_facility::Profile;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "revchain.toml";
const DEFAULT_DATABASE: &str = "revchain.db";
const DEFAULT_MIGRATIONS: &str = "migrations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn profile(self) -> Profile {
        match self {
            LogFormat::Pretty => Profile::Development,
            LogFormat::Json => Profile::Production,
        }
    }
}

/// Values taken from flags or the environment
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub migrations: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
}

/// Contents of `revchain.toml`; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<PathBuf>,
    migrations: Option<PathBuf>,
    log_format: Option<LogFormat>,
}

impl FileConfig {
    /// A missing file is an empty config; a malformed one is an error
    fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub migrations: PathBuf,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn resolve(overrides: CliOverrides, config_path: &Path) -> anyhow::Result<Self> {
        let file = FileConfig::load(config_path)?;
        Ok(Self {
            database: overrides
                .database
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            migrations: overrides
                .migrations
                .or(file.migrations)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATIONS)),
            log_format: overrides.log_format.or(file.log_format).unwrap_or_default(),
        })
    }
}
