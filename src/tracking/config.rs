//! Configuration and data directory discovery

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::tracking::models::AppConfig;
use crate::tracking::reader::ReaderError;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "FABTRACK_DATA_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

/// Get the snapshot data directory path
/// Priority: 1. Custom path, 2. FABTRACK_DATA_DIR env var, 3. Platform data dir
pub fn get_data_dir(custom_path: Option<&str>) -> PathBuf {
    // 1. Custom path takes highest priority
    if let Some(path) = custom_path {
        return PathBuf::from(path);
    }

    // 2. Check environment variable
    if let Ok(env_path) = env::var(DATA_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    // 3. Default to <data dir>/fabtrack
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("fabtrack");
    }

    // Fallback for edge cases
    PathBuf::from(".fabtrack")
}

pub fn get_config_path(custom_path: Option<&str>) -> PathBuf {
    get_data_dir(custom_path).join(CONFIG_FILE_NAME)
}

/// Load the configuration. A missing file yields the defaults.
pub fn load_config(custom_path: Option<&str>) -> Result<AppConfig, ReaderError> {
    let path = get_config_path(custom_path);
    if !path.exists() {
        log::debug!("No config at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(&path)?;
    let mut config: AppConfig = serde_json::from_str(&contents)?;
    if config.data_path.is_none() {
        config.data_path = custom_path.map(str::to_string);
    }
    Ok(config)
}

pub fn save_config(config: &AppConfig, custom_path: Option<&str>) -> Result<(), ReaderError> {
    let path = get_config_path(custom_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::models::Granularity;

    #[test]
    fn test_custom_path_wins() {
        assert_eq!(get_data_dir(Some("/srv/fab")), PathBuf::from("/srv/fab"));
        assert_eq!(
            get_config_path(Some("/srv/fab")),
            PathBuf::from("/srv/fab/config.json")
        );
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().to_str()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.default_granularity, Granularity::Month);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"defaultGranularity": "week"}"#).unwrap();

        let config = load_config(dir.path().to_str()).unwrap();
        assert_eq!(config.default_granularity, Granularity::Week);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.data_path.as_deref(), dir.path().to_str());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let custom = nested.to_str().unwrap();
        let config = AppConfig {
            data_path: Some(custom.to_string()),
            default_granularity: Granularity::Year,
            tick_interval_ms: 250,
        };

        save_config(&config, Some(custom)).unwrap();
        assert_eq!(load_config(Some(custom)).unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{").unwrap();
        assert!(matches!(
            load_config(dir.path().to_str()),
            Err(ReaderError::Json(_))
        ));
    }
}
