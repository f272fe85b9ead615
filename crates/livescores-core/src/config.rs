// Configuration loading (config/livescores.toml).
//
// The file is optional: every key has a default, and a missing file means
// "all defaults". `defaults/livescores.toml` is copied into `config/` on first
// run so operators have something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::client::DEFAULT_BASE_URL;

pub const CONFIG_FILE: &str = "livescores.toml";
pub const DB_FILE: &str = "livescores.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    /// Resolved path of the settings database.
    pub db_path: String,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_interval_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct StorageSection {
    db_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig { tick_rate_ms: 33 }
    }
}

/// Raw deserialization target for livescores.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiConfig,
    storage: StorageSection,
    ui: UiConfig,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/livescores.toml` relative to `base_dir`. A
/// missing file yields the defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let file = if path.exists() {
        let text = read_file(&path)?;
        toml::from_str::<ConfigFile>(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        ConfigFile::default()
    };

    let db_path = match file.storage.db_path {
        Some(p) if !p.trim().is_empty() => p,
        _ => default_db_path(),
    };

    let config = Config {
        api: file.api,
        db_path,
        ui: file.ui,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/livescores.toml` into `config/` when it is not there yet.
/// Returns the copied path, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if !source.is_file() || target.exists() {
        return Ok(None);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;

    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

/// `livescores.db` under the platform data directory, or the working
/// directory when no home directory can be determined.
pub fn default_db_path() -> String {
    directories::ProjectDirs::from("com", "dirtymittenracing", "livescores")
        .map(|dirs| dirs.data_dir().join(DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DB_FILE))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.api.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: format!("must start with http:// or https://, got `{base_url}`"),
        });
    }

    let positive: &[(&str, u64)] = &[
        ("api.refresh_interval_secs", config.api.refresh_interval_secs),
        ("api.request_timeout_secs", config.api.request_timeout_secs),
        ("ui.tick_rate_ms", config.ui.tick_rate_ms),
    ];
    for (name, val) in positive {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be greater than 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_base(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("livescores_config_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("config")).unwrap();
        dir
    }

    fn write_config(base: &Path, text: &str) {
        fs::write(base.join("config").join(CONFIG_FILE), text).unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let base = temp_base("missing");
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.api.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.ui.tick_rate_ms, 33);
        assert!(config.db_path.ends_with(DB_FILE));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let base = temp_base("partial");
        write_config(
            &base,
            r#"
            [api]
            refresh_interval_secs = 5

            [storage]
            db_path = "/tmp/custom.db"
            "#,
        );
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.api.refresh_interval_secs, 5);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.db_path, "/tmp/custom.db");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let base = temp_base("zero");
        write_config(&base, "[api]\nrefresh_interval_secs = 0\n");
        match load_config_from(&base).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "api.refresh_interval_secs")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let base = temp_base("badurl");
        write_config(&base, "[api]\nbase_url = \"ftp://nope\"\n");
        let err = load_config_from(&base).unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let base = temp_base("malformed");
        write_config(&base, "[api\nbase_url = ");
        assert!(matches!(
            load_config_from(&base).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn ensure_copies_defaults_once() {
        let base = temp_base("ensure");
        fs::create_dir_all(base.join("defaults")).unwrap();
        fs::write(
            base.join("defaults").join(CONFIG_FILE),
            "[ui]\ntick_rate_ms = 50\n",
        )
        .unwrap();

        let copied = ensure_config_file(&base).unwrap();
        assert_eq!(copied, Some(base.join("config").join(CONFIG_FILE)));
        assert_eq!(load_config_from(&base).unwrap().ui.tick_rate_ms, 50);

        // Second call leaves the operator's file alone.
        write_config(&base, "[ui]\ntick_rate_ms = 20\n");
        assert_eq!(ensure_config_file(&base).unwrap(), None);
        assert_eq!(load_config_from(&base).unwrap().ui.tick_rate_ms, 20);
        let _ = fs::remove_dir_all(&base);
    }
}
