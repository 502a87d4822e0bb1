use crate::config::{ConsoleConfig, SCHEMA_VERSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unknown schema_version in {path}: {version}")]
    UnknownSchema { path: PathBuf, version: u32 },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_path() -> PathBuf {
    home_dir().join(".reportdesk").join("config.json")
}

fn read_config_file(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    let data = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConsoleConfig =
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if config.schema_version != SCHEMA_VERSION {
        return Err(ConfigError::UnknownSchema {
            path: path.to_path_buf(),
            version: config.schema_version,
        });
    }
    Ok(config)
}

/// Missing file means defaults; anything else unreadable is an error.
pub fn load(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ConsoleConfig::default());
    }
    read_config_file(path)
}

pub fn save(path: &Path, config: &ConsoleConfig) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(config)
        .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err.to_string())))?;

    fs::write(&tmp_path, bytes).map_err(write_err)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path).map_err(write_err)?;
                fs::rename(&tmp_path, path).map_err(write_err)?;
                Ok(())
            } else {
                Err(write_err(rename_err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::selector::ConsistencyPolicy;
    use crate::ui::serializer::ListEncoding;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "reportdesk_config_store_{prefix}_{}_{}.json",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = temp_file("missing");
        let config = load(&path).expect("missing config should fall back to defaults");
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.search_debounce_ms, 250);
        assert_eq!(config.csrf_field, "csrf_token");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_file("partial");
        let data = r#"{
  "schema_version": 1,
  "base_url": "https://reports.example.edu",
  "list_encoding": "repeated",
  "consistency": "lenient"
}"#;
        fs::write(&path, data).expect("partial config fixture should write");

        let config = load(&path).expect("partial config should load");
        assert_eq!(config.base_url, "https://reports.example.edu");
        assert_eq!(config.list_encoding, ListEncoding::Repeated);
        assert_eq!(config.consistency, ConsistencyPolicy::Lenient);
        assert_eq!(config.search_debounce_ms, 250);
        assert!(config.page_file.is_none());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let path = temp_file("unknown");
        fs::write(&path, r#"{"schema_version": 99}"#).expect("fixture should write");

        let error = load(&path).expect_err("unknown schema should fail");
        assert!(matches!(error, ConfigError::UnknownSchema { version: 99, .. }));
        assert!(error.to_string().contains("unknown schema_version"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let path = temp_file("saved");
        let config = ConsoleConfig {
            search_debounce_ms: 0,
            method_override_field: Some("_method".to_string()),
            ..ConsoleConfig::default()
        };
        save(&path, &config).expect("config should save");
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load(&path).expect("saved config should load");
        assert_eq!(loaded, config);
        assert!(loaded.page_settings().search_debounce.is_zero());

        let _ = fs::remove_file(path);
    }
}
