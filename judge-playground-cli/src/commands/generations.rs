//! Generation commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use futures::StreamExt;
use judge_playground_sdk::{
    GenerateRequest, Generation, GenerationListParams, GenerationParams, StreamEvent,
};
use serde::Serialize;
use std::io::Write as _;

use crate::context::Context;
use crate::output::{
    format_relative_time, format_timestamp, print_field, print_optional_field, print_section,
    truncate, TableDisplay,
};

/// Arguments for `generate`
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Model slug (defaults to the configured default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Prompt text
    #[arg(short, long)]
    pub prompt: String,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Nucleus sampling threshold
    #[arg(long)]
    pub top_p: Option<f64>,

    /// Top-k sampling
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_new_tokens: Option<u32>,

    /// Print tokens as they arrive
    #[arg(long)]
    pub stream: bool,
}

/// Stored generation commands
#[derive(Debug, Args)]
pub struct GenerationsCommands {
    #[command(subcommand)]
    pub command: GenerationsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum GenerationsSubcommand {
    /// Get a generation by id
    Get {
        /// Generation ID
        id: i64,
    },

    /// List generations
    List {
        /// Page number (1-based)
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        page_size: Option<u32>,

        /// Maximum number of generations (overrides --page-size)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Offset, converted to the page containing it
        #[arg(long)]
        offset: Option<u32>,

        /// Text search
        #[arg(short, long)]
        search: Option<String>,

        /// Ordering field, e.g. -created_at
        #[arg(long)]
        ordering: Option<String>,
    },
}

/// Execute generation commands
pub async fn execute(ctx: &Context, cmd: GenerationsCommands) -> Result<()> {
    match cmd.command {
        GenerationsSubcommand::Get { id } => get(ctx, id).await,
        GenerationsSubcommand::List {
            page,
            page_size,
            limit,
            offset,
            search,
            ordering,
        } => {
            let mut params = GenerationListParams::new();
            params.page = page;
            params.page_size = page_size;
            params.limit = limit;
            params.offset = offset;
            params.search = search;
            params.ordering = ordering;
            list(ctx, params).await
        }
    }
}

/// Displayable generation for output
#[derive(Debug, Serialize)]
pub(crate) struct GenerationDisplay {
    #[serde(flatten)]
    generation: Generation,
}

impl From<Generation> for GenerationDisplay {
    fn from(generation: Generation) -> Self {
        Self { generation }
    }
}

impl TableDisplay for GenerationDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let g = &self.generation;
        vec![
            Cell::new(g.id),
            Cell::new(g.model.as_deref().unwrap_or("-")),
            Cell::new(truncate(g.prompt.as_deref().unwrap_or("-"), 40)),
            Cell::new(truncate(&g.output, 60)),
            Cell::new(
                g.created_at
                    .as_deref()
                    .map(format_relative_time)
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }

    fn display_single(&self) {
        let g = &self.generation;
        print_section("Generation");
        print_field("ID", &g.id.to_string());
        print_optional_field("Model", g.model.as_deref());
        print_optional_field("Created", g.created_at.as_deref().map(format_timestamp).as_deref());
        if let Some(ms) = g.latency_ms {
            print_field("Latency", &format!("{} ms", ms));
        }
        print_optional_field("Finish reason", g.finish_reason.as_deref());

        if let Some(prompt) = &g.prompt {
            print_section("Prompt");
            println!("{}", prompt);
        }
        print_section("Output");
        if g.output.is_empty() {
            println!("{}", "(empty)".dimmed());
        } else {
            println!("{}", g.output);
        }
    }

    fn display_compact(&self) {
        let g = &self.generation;
        println!(
            "{}\t{}\t{}",
            g.id,
            g.model.as_deref().unwrap_or("-"),
            truncate(&g.output.replace('\n', " "), 80)
        );
    }
}

/// Generate text
pub async fn generate(ctx: &Context, args: GenerateArgs) -> Result<()> {
    let client = ctx.create_client()?;
    let model = ctx.model(args.model)?;

    let params = GenerationParams {
        temperature: args.temperature,
        top_p: args.top_p,
        top_k: args.top_k,
        max_new_tokens: args.max_new_tokens,
    };
    let mut request = GenerateRequest::new(&model, &args.prompt);
    if !params.is_empty() {
        request = request.with_params(params);
    }

    if args.stream {
        return stream(ctx, &client, &request).await;
    }

    let spinner = ctx.output.spinner(&format!("Generating with {}...", model));
    let generation = client
        .generations()
        .generate_with(&request)
        .await
        .context("Generation failed");

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let display: GenerationDisplay = generation?.into();
    ctx.output.write(&display)?;

    Ok(())
}

async fn stream(
    ctx: &Context,
    client: &judge_playground_sdk::JudgePlaygroundClient,
    request: &GenerateRequest,
) -> Result<()> {
    let mut events = client
        .generations()
        .generate_stream(request)
        .await
        .context("Streaming generation failed")?;

    let mut stdout = std::io::stdout();
    let mut text = String::new();

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Start => tracing::debug!("stream started"),
            StreamEvent::Token(token) => {
                print!("{}", token);
                stdout.flush()?;
                text.push_str(&token);
            }
            StreamEvent::Error(message) => {
                println!();
                anyhow::bail!("generation stream failed: {}", message);
            }
            StreamEvent::Done => break,
        }
    }
    println!();

    if text.is_empty() {
        ctx.output.warning("Model returned no tokens");
    }
    Ok(())
}

async fn get(ctx: &Context, id: i64) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching generation...");
    let generation = client.generations().get(id).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let display: GenerationDisplay = generation
        .with_context(|| format!("Failed to fetch generation {}", id))?
        .into();
    ctx.output.write(&display)?;

    Ok(())
}

async fn list(ctx: &Context, params: GenerationListParams) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching generations...");
    let page = client.generations().list(&params).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let page = page?;
    let has_more = page.has_more();
    let total = page.count;

    let generations: Vec<GenerationDisplay> = page.results.into_iter().map(Into::into).collect();
    ctx.output
        .write_list(&generations, &["ID", "Model", "Prompt", "Output", "Created"])?;

    if has_more {
        ctx.output.info(&format!(
            "Showing {} of {} generations. Use --page to paginate.",
            generations.len(),
            total
        ));
    }

    Ok(())
}
