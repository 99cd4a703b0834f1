//! CLI configuration, read from `gaql.toml`.
//!
//! ```toml
//! [format]
//! indent = 4
//!
//! [validate]
//! strict = true
//!
//! [output]
//! color = false
//! ```
//!
//! Every key is optional. Lookup order is `./gaql.toml`, then
//! `<config_dir>/gaql/config.toml`; without either file the defaults apply.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GaqlError, GaqlResult};
use crate::fmt::DEFAULT_INDENT;

pub const LOCAL_FILE: &str = "gaql.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub format: FormatConfig,
    pub validate: ValidateConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatConfig {
    /// Spaces before the WHERE continuation line
    #[serde(default = "default_indent")]
    pub indent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidateConfig {
    /// Fail on the first problem with a typed error
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Colorize terminal output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_true() -> bool {
    true
}

fn default_indent() -> usize {
    DEFAULT_INDENT
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> GaqlResult<Self> {
        toml::from_str(content).map_err(|e| GaqlError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> GaqlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| GaqlError::Config(format!("{}: {}", path.display(), config_message(e))))
    }

    /// Load the first configuration file found, or the defaults.
    pub fn discover() -> GaqlResult<Self> {
        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gaql").join("config.toml"));
        }
        paths
    }
}

fn config_message(err: GaqlError) -> String {
    match err {
        GaqlError::Config(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.format.indent, 2);
        assert!(!config.validate.strict);
        assert!(config.output.color);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml("[validate]\nstrict = true\n").unwrap();
        assert!(config.validate.strict);
        assert_eq!(config.format.indent, 2);
        assert!(config.output.color);

        let config = Config::from_toml("[format]\n[output]\ncolor = false\n").unwrap();
        assert_eq!(config.format.indent, 2);
        assert!(!config.output.color);
    }

    #[test]
    fn test_empty_sections_use_field_defaults() {
        let config = Config::from_toml("[format]\n[output]\n").unwrap();
        assert_eq!(config.format.indent, DEFAULT_INDENT);
        assert!(config.output.color);
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_file() {
        let err = Config::from_toml("[format]\nindent = \"wide\"\n").unwrap_err();
        assert!(matches!(err, GaqlError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_load_reports_path() {
        let path = std::env::temp_dir().join(format!("gaql-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[output]\ncolor = 3\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/gaql.toml").unwrap_err();
        assert!(matches!(err, GaqlError::Io(_)));
    }
}
