//! CLI configuration management
//!
//! Settings are layered: built-in defaults, then `config.toml` in the
//! platform config directory, then `JUDGE_PLAYGROUND_*` environment
//! variables. Command-line flags are applied on top by [`crate::context`].

use anyhow::{Context as _, Result};
use config::{Config as ConfigLoader, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `JUDGE_PLAYGROUND_TIMEOUT_SECS`
pub const ENV_PREFIX: &str = "JUDGE_PLAYGROUND";

/// Keys accepted by `config set`
pub const KEYS: [&str; 6] = [
    "api_url",
    "timeout_secs",
    "output_format",
    "color",
    "default_model",
    "judge_model",
];

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Backend base URL; unset means the SDK default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Default output format
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Model used when `--model` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Judge model used when `--judge-model` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout(),
            output_format: default_output_format(),
            color: true,
            default_model: None,
            judge_model: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from the default location and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration layered over the file at `path` (which may be missing)
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let config = ConfigLoader::builder()
            .set_default("timeout_secs", defaults.timeout_secs as i64)?
            .set_default("output_format", defaults.output_format)?
            .set_default("color", defaults.color)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        config
            .try_deserialize()
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "judge-playground", "judge-playground")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set one key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "api_url" => self.api_url = optional(value),
            "timeout_secs" => self.timeout_secs = value.parse().context("Invalid number")?,
            "output_format" => {
                value
                    .parse::<crate::output::OutputFormat>()
                    .map_err(anyhow::Error::msg)?;
                self.output_format = value.to_string();
            }
            "color" => self.color = value.parse().context("Invalid boolean value")?,
            "default_model" => self.default_model = optional(value),
            "judge_model" => self.judge_model = optional(value),
            _ => anyhow::bail!(
                "Unknown configuration key: {} (expected one of {})",
                key,
                KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Key/value pairs for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());
        vec![
            ("api_url", or_unset(&self.api_url)),
            ("timeout_secs", self.timeout_secs.to_string()),
            ("output_format", self.output_format.clone()),
            ("color", self.color.to_string()),
            ("default_model", or_unset(&self.default_model)),
            ("judge_model", or_unset(&self.judge_model)),
        ]
    }
}

fn default_output_format() -> String {
    "table".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.output_format, "table");
        assert!(config.color);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.output_format, "table");
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.set("api_url", "http://backend:8000").unwrap();
        config.set("timeout_secs", "30").unwrap();
        config.set("judge_model", "qwen2.5").unwrap();
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_url.as_deref(), Some("http://backend:8000"));
        assert_eq!(loaded.timeout_secs, 30);
        assert_eq!(loaded.judge_model.as_deref(), Some("qwen2.5"));
        assert!(loaded.color);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = CliConfig::default();
        assert!(config.set("timeout_secs", "soon").is_err());
        assert!(config.set("output_format", "xml").is_err());
        assert!(config.set("profile", "x").is_err());

        config.set("api_url", "").unwrap();
        assert!(config.api_url.is_none());
    }
}
