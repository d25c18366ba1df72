//! Connectivity check

use anyhow::Result;
use judge_playground_sdk::ConnectionStatus;

use crate::context::Context;
use crate::output::OutputFormat;

pub async fn execute(ctx: &Context) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner(&format!("Contacting {}...", ctx.api_url()));
    let status = client.test_connection().await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    if matches!(ctx.output_format(), OutputFormat::Json | OutputFormat::Yaml) {
        ctx.output.write_value(&status)?;
    }

    match status {
        ConnectionStatus::Connected { status } => {
            ctx.output
                .success(&format!("Connected to {} (HTTP {})", ctx.api_url(), status));
            Ok(())
        }
        ConnectionStatus::Error { message } => {
            anyhow::bail!("cannot reach backend at {}: {}", ctx.api_url(), message)
        }
    }
}
