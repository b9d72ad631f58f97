//! Configuration file reading and parsing.
//!
//! Reads the `[caches]` section of an INI-format repository configuration
//! file. A caller that passes no path gets the built-in defaults.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::CachesConfig;

// =============================================================================
// Constants - Default Values
// =============================================================================

const SECTION_CACHES: &str = "caches";
const OPTION_FAIL_STOP: &str = "fail-stop";
const OPTION_MEMCACHED_SERVERS: &str = "memcached-servers";

const DEFAULT_FAIL_STOP: bool = false;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading cache configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// Parsing Helpers
// =============================================================================

/// Parse a boolean value, falling back to `default` when the key is absent.
fn parse_bool(ini: &Ini, section: &str, key: &str, default: bool) -> Result<bool> {
    match ini.get(section, key) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean {
                key: key.to_string(),
                value: v.to_string(),
            }),
        },
    }
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract the `[caches]` section from a parsed INI file.
fn parse_caches_section(ini: &Ini) -> Result<CachesConfig> {
    let fail_stop = parse_bool(ini, SECTION_CACHES, OPTION_FAIL_STOP, DEFAULT_FAIL_STOP)?;

    let memcached_servers = ini
        .get(SECTION_CACHES, OPTION_MEMCACHED_SERVERS)
        .map(|v| parse_comma_separated(&v))
        .unwrap_or_default();

    Ok(CachesConfig {
        fail_stop,
        memcached_servers,
    })
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Read cache configuration.
///
/// With `Some(path)`, the file must exist and parse; with `None`, the
/// built-in defaults are returned.
pub fn read_caches_config(path: Option<&Path>) -> Result<CachesConfig> {
    let path = match path {
        Some(path) => path,
        None => return Ok(CachesConfig::default()),
    };

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let ini = load_ini(path)?;
    parse_caches_section(&ini)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<CachesConfig> {
        let mut ini = Ini::new();
        ini.read(text.to_string()).unwrap();
        parse_caches_section(&ini)
    }

    #[test]
    fn test_defaults_without_file() {
        let config = read_caches_config(None).unwrap();
        assert!(!config.fail_stop);
        assert!(config.memcached_servers.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = read_caches_config(Some(Path::new("/nonexistent/fsfs.conf")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_caches_section() {
        let config = parse(
            r#"
[caches]
fail-stop = true
memcached-servers = cache1:11211, cache2:11211
"#,
        )
        .unwrap();

        assert!(config.fail_stop);
        assert_eq!(
            config.memcached_servers,
            vec!["cache1:11211".to_string(), "cache2:11211".to_string()]
        );
    }

    #[test]
    fn test_absent_section_yields_defaults() {
        let config = parse("[other]\nkey = value\n").unwrap();
        assert_eq!(config, CachesConfig::default());
    }

    #[test]
    fn test_invalid_boolean() {
        let result = parse("[caches]\nfail-stop = maybe\n");
        assert!(matches!(result, Err(ConfigError::InvalidBoolean { .. })));
    }
}
