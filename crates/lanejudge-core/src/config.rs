//! Configuration file support.
//!
//! Settings are read from a TOML file with the following search order:
//! 1. Path given on the command line
//! 2. `./lanejudge.toml` (current directory)
//! 3. `<config dir>/lanejudge/lanejudge.toml` (e.g. `~/.config` on Linux)
//! 4. `/etc/lanejudge/lanejudge.toml` (system-wide)
//!
//! Command-line options override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::protocol::DEFAULT_BAUD_RATE;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "lanejudge.toml";

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Timer connection
    pub timer: TimerConfig,
    /// Result display
    pub display: DisplayConfig,
}

/// General application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Timer connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Serial device path, e.g. /dev/ttyUSB0
    pub port: Option<String>,
    /// Baud rate
    pub baud: u32,
    /// Open the port without serial configuration and never rearm
    pub debug: bool,
    /// Use the built-in simulated timer instead of a device
    pub simulate: bool,
    /// Lane count of the simulated timer
    pub simulated_lanes: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD_RATE,
            debug: false,
            simulate: false,
            simulated_lanes: 4,
        }
    }
}

/// Result output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (optionally through display commands)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Result display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Output format
    pub output: OutputFormat,
    /// Clear the screen before announcing a winner (display commands only)
    pub clear_screen: bool,
    /// Command rendering the winner, e.g. `["toilet", "-f", "bigmono12", "-F", "border"]`
    pub winner_command: Vec<String>,
    /// Command rendering the lane times, e.g. `["toilet", "-f", "future"]`
    pub times_command: Vec<String>,
}

impl DisplayConfig {
    /// True when external display commands are configured
    pub fn uses_commands(&self) -> bool {
        !self.winner_command.is_empty() || !self.times_command.is_empty()
    }
}

/// Default search paths, most specific first
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("lanejudge").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/lanejudge").join(CONFIG_FILE_NAME));
    paths
}

impl JudgeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(origin.to_path_buf(), e.to_string()))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        Self::from_toml(&content, path)
    }

    /// Load the first config file found in the default search paths.
    ///
    /// Returns `(config, path_where_found)`, or defaults and `None` when no
    /// file exists.
    pub fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_from_paths(&config_search_paths())
    }

    fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in paths {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                return Ok((Self::load_from_file(path)?, Some(path.clone())));
            }
        }
        Ok((Self::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.timer.baud, 1200);
        assert_eq!(config.timer.simulated_lanes, 4);
        assert_eq!(config.display.output, OutputFormat::Text);
        assert!(!config.display.uses_commands());
    }

    #[test]
    fn test_parse_partial_file() {
        let toml = r#"
            [timer]
            port = "/dev/ttyUSB0"
            debug = true

            [display]
            output = "json"
            winner_command = ["toilet", "-f", "bigmono12", "-F", "border"]
        "#;
        let config = JudgeConfig::from_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.timer.port.as_deref(), Some("/dev/ttyUSB0"));
        assert!(config.timer.debug);
        assert_eq!(config.timer.baud, 1200);
        assert_eq!(config.display.output, OutputFormat::Json);
        assert!(config.display.uses_commands());
        assert_eq!(config.general.log_level, None);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = JudgeConfig::from_toml("[timer\nport = 1", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(ref p, _) if p == Path::new("bad.toml")));
    }

    #[test]
    fn test_load_from_paths_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("lanejudge.toml");
        std::fs::write(&present, "[general]\nlog_level = \"debug\"\n").unwrap();

        let (config, found) = JudgeConfig::load_from_paths(&[missing, present.clone()]).unwrap();
        assert_eq!(found, Some(present));
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_from_paths_none_found() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) =
            JudgeConfig::load_from_paths(&[dir.path().join("nope.toml")]).unwrap();
        assert_eq!(found, None);
        assert_eq!(config, JudgeConfig::default());
    }

    #[test]
    fn test_read_error() {
        let err = JudgeConfig::load_from_file(Path::new("/nonexistent/lanejudge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(..)));
    }
}
