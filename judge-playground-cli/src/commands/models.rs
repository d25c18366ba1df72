//! Models commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use judge_playground_sdk::InferenceModel;
use serde::Serialize;

use crate::context::Context;
use crate::output::{print_field, print_optional_field, print_section, TableDisplay};

/// Model catalog commands
#[derive(Debug, Args)]
pub struct ModelsCommands {
    #[command(subcommand)]
    pub command: ModelsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ModelsSubcommand {
    /// List inference models
    List {
        /// Only show active models
        #[arg(short, long)]
        active: bool,
    },
}

/// Execute model commands
pub async fn execute(ctx: &Context, cmd: ModelsCommands) -> Result<()> {
    match cmd.command {
        ModelsSubcommand::List { active } => list(ctx, active).await,
    }
}

/// Displayable model for output
#[derive(Debug, Serialize)]
struct ModelDisplay {
    #[serde(flatten)]
    model: InferenceModel,
}

impl TableDisplay for ModelDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let m = &self.model;
        vec![
            Cell::new(&m.slug),
            Cell::new(m.label()),
            Cell::new(&m.backend),
            Cell::new(&m.repo_id),
            Cell::new(if m.is_active { "yes" } else { "no" }),
        ]
    }

    fn display_single(&self) {
        let m = &self.model;
        print_section("Model");
        print_field("Slug", &m.slug);
        print_optional_field("Name", m.display_name.as_deref());
        print_field("Backend", &m.backend);
        print_field("Repository", &m.repo_id);
        print_field("Active", &m.is_active.to_string());
    }

    fn display_compact(&self) {
        let m = &self.model;
        println!("{}\t{}\t{}", m.slug, m.backend, m.repo_id);
    }
}

async fn list(ctx: &Context, active: bool) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching models...");
    let models = if active {
        client.models().list_active().await
    } else {
        client.models().list().await
    };

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let models = models.context("Failed to list models")?;
    if models.is_empty() {
        ctx.output.warning(&format!(
            "No inference models available; {} until the backend registers one.",
            "generation is disabled".bold()
        ));
    }

    let models: Vec<ModelDisplay> = models
        .into_iter()
        .map(|model| ModelDisplay { model })
        .collect();
    ctx.output
        .write_list(&models, &["Slug", "Name", "Backend", "Repository", "Active"])?;

    Ok(())
}
