/*!
 * Tests for application configuration
 */

use anyhow::Result;
use std::fs;
use subtrans::app_config::{Config, LogLevel};

use crate::common;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&config_path)?;

    assert!(config_path.exists());
    assert_eq!(config, Config::default());

    let written: Config = serde_json::from_str(&fs::read_to_string(&config_path)?)?;
    assert_eq!(written, config);
    Ok(())
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "log_level": "debug", "translation": { "max_retries": 5 } }"#,
    )?;

    let config = Config::load_or_create(&config_path)?;

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.max_retries, 5);
    assert_eq!(config.translation.concurrent_requests, 4);
    assert_eq!(config.context.max_batch_size, Some(20));
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&config_path).is_err());
    Ok(())
}

#[test]
fn test_validate_withNegativeSceneThreshold_shouldFail() {
    let mut config = Config::default();
    config.context.scene_threshold = Some(-1.0);

    assert!(config.validate().is_err());
}

#[test]
fn test_validationLimits_withContextOverrides_shouldUseThem() {
    let mut config = Config::default();
    config.context.max_characters = Some(42);

    let limits = config.validation_limits();
    assert_eq!(limits.max_characters, 42);
    assert_eq!(limits.max_newlines, 3);
}

#[test]
fn test_logLevel_toLevelFilter_shouldMapEachLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Info.to_level_filter(), log::LevelFilter::Info);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
