use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::file_utils::FileManager;
use crate::project::ProjectContext;
use crate::translation::batcher::BatchThresholds;
use crate::translation::translator::TranslatorOptions;
use crate::validation::ValidationLimits;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Default project context, reconciled with each project's own context
    #[serde(default = "default_context")]
    pub context: ProjectContext,

    /// Translation driver settings
    #[serde(default)]
    pub translation: TranslatorOptions,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

// @returns: Context with every batching and validation setting spelled out
fn default_context() -> ProjectContext {
    let thresholds = BatchThresholds::default();
    let limits = ValidationLimits::default();
    ProjectContext {
        scene_threshold: Some(thresholds.scene_gap_ms as f64 / 1000.0),
        batch_threshold: Some(thresholds.batch_gap_ms as f64 / 1000.0),
        min_batch_size: Some(thresholds.min_batch_size),
        max_batch_size: Some(thresholds.max_batch_size),
        max_characters: Some(limits.max_characters),
        max_newlines: Some(limits.max_newlines),
        ..Default::default()
    }
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let context = &self.context;

        if context.scene_threshold.is_some_and(|s| s <= 0.0) || context.batch_threshold.is_some_and(|b| b <= 0.0) {
            return Err(anyhow!("Scene and batch thresholds must be positive"));
        }

        self.batch_thresholds()
            .validate()
            .map_err(|e| anyhow!("Invalid batching settings: {}", e))?;

        let limits = self.validation_limits();
        if limits.max_characters == 0 {
            return Err(anyhow!("max_characters must be positive"));
        }

        if self.translation.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }

        Ok(())
    }

    pub fn batch_thresholds(&self) -> BatchThresholds {
        self.context.batch_thresholds()
    }

    pub fn validation_limits(&self) -> ValidationLimits {
        self.context.validation_limits()
    }

    /// Load the configuration, writing the defaults first if the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if FileManager::file_exists(path) {
            let json = FileManager::read_to_string(path)?;
            let config: Config = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(path, &config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            context: default_context(),
            translation: TranslatorOptions::default(),
            log_level: LogLevel::default(),
        }
    }
}
