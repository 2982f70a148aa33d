use crate::error::AppError;
use crate::storage::json_store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "SPRINTBOARD_CONFIG_PATH";
const STORE_ENV_VAR: &str = "SPRINTBOARD_STORE_PATH";

pub const DEFAULT_FIRST_PAGE_SIZE: usize = 7;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub first_page_size: Option<usize>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn first_page_size(&self) -> usize {
        self.first_page_size.unwrap_or(DEFAULT_FIRST_PAGE_SIZE)
    }

    /// `SPRINTBOARD_STORE_PATH` wins over the configured path, which wins
    /// over the per-user default.
    pub fn store_location(&self) -> Result<PathBuf, AppError> {
        if let Ok(path) = std::env::var(STORE_ENV_VAR)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
        match self.store_path.as_ref() {
            Some(path) => Ok(path.clone()),
            None => json_store::store_path(),
        }
    }

    fn validated(self) -> Result<Self, AppError> {
        if self.first_page_size == Some(0) {
            return Err(AppError::config("first_page_size must be at least 1"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub first_page_size: Option<usize>,
    pub store_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl ConfigOverrides {
    /// Apply one `KEY=VALUE` override. Keys are matched loosely, so
    /// `first-page-size` and `FIRST_PAGE_SIZE` both name `first_page_size`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        match canonical_key(key).as_str() {
            "first_page_size" => {
                let size = value.parse::<usize>().map_err(|_| {
                    AppError::config(format!("first_page_size must be a number, got '{value}'"))
                })?;
                if size == 0 {
                    return Err(AppError::config("first_page_size must be at least 1"));
                }
                self.first_page_size = Some(size);
            }
            "store_path" => {
                if value.is_empty() {
                    return Err(AppError::config("store_path must not be empty"));
                }
                self.store_path = Some(PathBuf::from(value));
            }
            "log_filter" => {
                if value.is_empty() {
                    return Err(AppError::config("log_filter must not be empty"));
                }
                self.log_filter = Some(value.to_string());
            }
            other => return Err(AppError::config(format!("unknown config key '{other}'"))),
        }
        Ok(())
    }
}

pub fn canonical_key(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::config("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("sprintboard")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::config("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("sprintboard")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::config(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::config(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.validated()
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(size) = overrides.first_page_size {
        merged.first_page_size = Some(size);
    }
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }
    if let Some(filter) = overrides.log_filter.as_ref() {
        merged.log_filter = Some(filter.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, DEFAULT_FIRST_PAGE_SIZE, canonical_key, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides,
    };
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let dir = TempDir::new().unwrap();
        let result = load_config_with_fallback_from_path(&dir.path().join("missing.json"));

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
        assert_eq!(result.config.first_page_size(), DEFAULT_FIRST_PAGE_SIZE);
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_config"));
    }

    #[test]
    fn load_config_rejects_zero_page_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero.json");
        fs::write(&path, r#"{ "first_page_size": 0 }"#).unwrap();

        let result = load_config_with_fallback_from_path(&path);
        assert_eq!(result.config.first_page_size(), DEFAULT_FIRST_PAGE_SIZE);
        assert!(result.error.is_some());
    }

    #[test]
    fn load_config_reads_valid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valid.json");
        let content = serde_json::json!({
            "first_page_size": 10,
            "store_path": "/tmp/board.json",
            "log_filter": "sprintboard_core=debug"
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();

        assert_eq!(loaded.first_page_size(), 10);
        assert_eq!(loaded.store_path, Some(PathBuf::from("/tmp/board.json")));
        assert_eq!(loaded.log_filter.as_deref(), Some("sprintboard_core=debug"));
    }

    #[test]
    fn overrides_accept_loose_keys() {
        let mut overrides = ConfigOverrides::default();
        overrides.set("First-Page-Size", "3").unwrap();
        overrides.set("STORE_PATH", " /tmp/other.json ").unwrap();
        overrides.set("log filter", "debug").unwrap();

        assert_eq!(overrides.first_page_size, Some(3));
        assert_eq!(overrides.store_path, Some(PathBuf::from("/tmp/other.json")));
        assert_eq!(overrides.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn overrides_reject_bad_values() {
        let mut overrides = ConfigOverrides::default();
        assert_eq!(
            overrides.set("first_page_size", "0").unwrap_err().code(),
            "invalid_config"
        );
        assert!(overrides.set("first_page_size", "many").is_err());
        assert!(overrides.set("theme", "noir").is_err());
        assert_eq!(overrides, ConfigOverrides::default());
    }

    #[test]
    fn merge_overrides_preserves_base_config() {
        let base = Config {
            first_page_size: Some(9),
            store_path: Some(PathBuf::from("/tmp/base.json")),
            log_filter: None,
        };
        let overrides = ConfigOverrides {
            first_page_size: Some(4),
            store_path: None,
            log_filter: Some("info".into()),
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(base.first_page_size, Some(9));
        assert_eq!(merged.first_page_size, Some(4));
        assert_eq!(merged.store_path, Some(PathBuf::from("/tmp/base.json")));
        assert_eq!(merged.log_filter.as_deref(), Some("info"));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            first_page_size: Some(5),
            ..Config::default()
        };

        let merged = merge_overrides(&base, &ConfigOverrides::default());

        assert_eq!(merged, base);
    }

    #[test]
    fn canonical_key_maps_variants() {
        assert_eq!(canonical_key("first-page-size"), "first_page_size");
        assert_eq!(canonical_key("  Log Filter "), "log_filter");
        assert_eq!(canonical_key("store__path"), "store_path");
        assert_eq!(canonical_key("--"), "");
    }
}
