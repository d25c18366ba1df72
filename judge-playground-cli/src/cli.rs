//! Command-line definition

use clap::{Parser, Subcommand};

use crate::commands::config::ConfigCommands;
use crate::commands::datasets::DatasetsCommands;
use crate::commands::evaluate::{JudgeCommands, MetricsCommands, RunArgs};
use crate::commands::generations::{GenerateArgs, GenerationsCommands};
use crate::commands::label::LabelCommands;
use crate::commands::models::ModelsCommands;
use crate::output::OutputFormat;

/// Generate text, score it with metrics and an LLM judge, and label datasets
#[derive(Debug, Parser)]
#[command(name = "judge-playground", version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config and API_BASE)
    #[arg(long, global = true, env = "JUDGE_PLAYGROUND_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log requests and pipeline steps to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check whether the backend is reachable
    Ping,

    /// Generate text with a model
    Generate(GenerateArgs),

    /// Browse stored generations
    Generations(GenerationsCommands),

    /// Classic text-similarity metrics
    Metrics(MetricsCommands),

    /// LLM-as-judge scoring
    Judge(JudgeCommands),

    /// Generate, then score with metrics and the judge
    Run(RunArgs),

    /// Upload and browse datasets
    Datasets(DatasetsCommands),

    /// Inference model catalog
    Models(ModelsCommands),

    /// Label dataset rows with a model
    Label(LabelCommands),

    /// Manage CLI configuration
    Config(ConfigCommands),
}
