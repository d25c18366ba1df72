//! CLI execution context

use anyhow::{Context as _, Result};
use judge_playground_sdk::{api_base, JudgePlaygroundClient, SdkConfig};
use std::time::Duration;

use crate::cli::Cli;
use crate::config::CliConfig;
use crate::output::{OutputFormat, OutputWriter};

/// Execution context for CLI commands
pub struct Context {
    /// CLI configuration
    pub config: CliConfig,

    /// Output writer
    pub output: OutputWriter,

    /// Verbose mode
    pub verbose: bool,

    /// API URL override
    pub api_url_override: Option<String>,
}

impl Context {
    /// Create a new context from CLI arguments
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = match CliConfig::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "ignoring unreadable config");
                CliConfig::default()
            }
        };

        // Flag, then config file, then table
        let output_format = cli
            .output
            .or_else(|| config.output_format.parse().ok())
            .unwrap_or_default();
        let output = OutputWriter::new(output_format, cli.no_color || !config.color);

        Ok(Self {
            config,
            output,
            verbose: cli.verbose,
            api_url_override: cli.api_url.clone(),
        })
    }

    /// Get the effective API URL
    pub fn api_url(&self) -> &str {
        self.api_url_override
            .as_deref()
            .or(self.config.api_url.as_deref())
            .unwrap_or_else(|| api_base())
    }

    /// The active output format
    pub fn output_format(&self) -> OutputFormat {
        self.output.format()
    }

    /// Model from the flag, else the configured default
    pub fn model(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.config.default_model.clone()).context(
            "No model given. Pass --model or run 'judge-playground config set default_model <slug>'.",
        )
    }

    /// Judge model from the flag, else the configured one (may be none)
    pub fn judge_model(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.config.judge_model.clone())
    }

    /// Create an SDK client
    pub fn create_client(&self) -> Result<JudgePlaygroundClient> {
        let config = SdkConfig::new(self.api_url())
            .with_timeout(Duration::from_secs(self.config.timeout_secs))
            .with_logging(self.verbose);

        JudgePlaygroundClient::new(config).context("Failed to create API client")
    }
}
