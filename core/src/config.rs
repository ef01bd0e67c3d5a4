//! Configuration for the formula compiler and plan verification.
//!
//! Settings are stored in TOML. Every section and field is optional; an
//! empty document yields the defaults.
//!
//! ```toml
//! [compiler]
//! frames_per_second = 60
//! trace = false
//!
//! [verify]
//! ram_size = 2048
//! max_steps = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ram::NES_SYSTEM_RAM_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Formula compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Plan verification settings
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Formula compiler tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Frames per second used by the `<n>S` seconds shorthand (default: 60)
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: u32,
    /// Emit per-token debug events while compiling (default: false)
    #[serde(default)]
    pub trace: bool,
}

/// Plan verification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Size of the scratch RAM domain plans are executed against (default: 2048)
    #[serde(default = "default_ram_size")]
    pub ram_size: usize,
    /// Plans with more steps than this are refused (default: 10000)
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_frames_per_second() -> u32 {
    60
}
fn default_ram_size() -> usize {
    NES_SYSTEM_RAM_SIZE
}
fn default_max_steps() -> usize {
    10_000
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            trace: false,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            ram_size: default_ram_size(),
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.compiler.frames_per_second, 60);
        assert!(!config.compiler.trace);
        assert_eq!(config.verify.ram_size, 2048);
        assert_eq!(config.verify.max_steps, 10_000);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml("[compiler]\nframes_per_second = 50\n").unwrap();
        assert_eq!(config.compiler.frames_per_second, 50);
        assert!(!config.compiler.trace);
        assert_eq!(config.verify, VerifyConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[compiler\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verify]\nmax_steps = 12\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.verify.max_steps, 12);
        assert_eq!(config.verify.ram_size, 2048);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
