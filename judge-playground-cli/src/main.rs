mod cli;
mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use judge_playground_sdk::SdkError;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::context::Context;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        eprintln!("Error: {}", describe_error(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Ping => commands::ping::execute(&ctx).await,
        Commands::Generate(args) => commands::generations::generate(&ctx, args).await,
        Commands::Generations(cmd) => commands::generations::execute(&ctx, cmd).await,
        Commands::Metrics(cmd) => commands::evaluate::metrics(&ctx, cmd).await,
        Commands::Judge(cmd) => commands::evaluate::judge(&ctx, cmd).await,
        Commands::Run(args) => commands::evaluate::run(&ctx, args).await,
        Commands::Datasets(cmd) => commands::datasets::execute(&ctx, cmd).await,
        Commands::Models(cmd) => commands::models::execute(&ctx, cmd).await,
        Commands::Label(cmd) => commands::label::execute(&ctx, cmd).await,
        Commands::Config(cmd) => commands::config::execute(&ctx, cmd).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// One-line message for the user, classifying backend failures
fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SdkError>() {
        Some(e) if e.is_network_error() => format!("cannot reach backend: {}", e),
        Some(e) if e.is_server_error() => format!("backend unavailable: {}", e),
        _ => format!("{:#}", err),
    }
}
