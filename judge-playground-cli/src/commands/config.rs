//! Configuration commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use crate::config::{CliConfig, KEYS};
use crate::context::Context;
use crate::output::OutputFormat;

/// Configuration management commands
#[derive(Debug, Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value (an empty value unsets optional keys)
    Set {
        /// Configuration key, e.g. default_model
        key: String,

        /// Value to set
        value: String,
    },

    /// Show the configuration file path
    Path,

    /// Reset configuration to defaults
    Reset {
        /// Force reset without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Execute configuration commands
pub async fn execute(ctx: &Context, cmd: ConfigCommands) -> Result<()> {
    match cmd.command {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Get { key } => get(ctx, &key),
        ConfigSubcommand::Set { key, value } => set(ctx, &key, &value),
        ConfigSubcommand::Path => show_path(),
        ConfigSubcommand::Reset { force } => reset(ctx, force),
    }
}

#[derive(Serialize)]
struct EffectiveConfig<'a> {
    #[serde(flatten)]
    config: &'a CliConfig,
    effective_api_url: &'a str,
}

fn show(ctx: &Context) -> Result<()> {
    if matches!(ctx.output_format(), OutputFormat::Json | OutputFormat::Yaml) {
        return ctx.output.write_value(&EffectiveConfig {
            config: &ctx.config,
            effective_api_url: ctx.api_url(),
        });
    }

    println!("{}", "Configuration".bold().underline());
    println!();
    for (key, value) in ctx.config.entries() {
        println!("  {}: {}", key.cyan(), value);
    }
    println!();
    println!("{}: {}", "Effective API URL".cyan(), ctx.api_url());

    Ok(())
}

fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = ctx
        .config
        .entries()
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .with_context(|| {
            format!(
                "Unknown configuration key: {} (expected one of {})",
                key,
                KEYS.join(", ")
            )
        })?;

    println!("{}", value);
    Ok(())
}

fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = ctx.config.clone();
    config.set(key, value)?;
    config.save().context("Failed to save configuration")?;

    if value.is_empty() {
        ctx.output.success(&format!("Unset {}", key));
    } else {
        ctx.output.success(&format!("Set {} = {}", key, value));
    }
    Ok(())
}

fn show_path() -> Result<()> {
    let path = CliConfig::config_path()?;
    let status = if path.exists() { "✓".green() } else { "✗".red() };
    println!("{} {}", status, path.display());
    Ok(())
}

fn reset(ctx: &Context, force: bool) -> Result<()> {
    if !force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Reset all configuration to defaults?")
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirm {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    CliConfig::default()
        .save()
        .context("Failed to save configuration")?;
    ctx.output.success("Configuration reset to defaults");
    Ok(())
}
