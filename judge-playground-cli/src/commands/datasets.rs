//! Dataset commands

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use judge_playground_sdk::{
    Dataset, DatasetKind, DatasetRow, PaginationParams, RowsParams, UploadFile,
};
use serde::Serialize;

use crate::context::Context;
use crate::output::{
    format_relative_time, format_timestamp, label_badge, print_field, print_optional_field,
    print_section, truncate, TableDisplay,
};

/// Dataset management commands
#[derive(Debug, Args)]
pub struct DatasetsCommands {
    #[command(subcommand)]
    pub command: DatasetsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum DatasetsSubcommand {
    /// Upload a CSV, JSON, JSONL or NDJSON file as a new dataset
    Upload {
        /// File to upload
        file: PathBuf,

        /// Dataset name (defaults to the file name on the backend)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List datasets
    List {
        /// Maximum number of datasets to return
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of datasets to skip
        #[arg(long)]
        offset: Option<u32>,
    },

    /// Get dataset details
    Get {
        /// Dataset ID
        id: i64,
    },

    /// List the rows of a dataset
    Rows {
        /// Dataset ID
        id: i64,

        /// Maximum number of rows to return
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Number of rows to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Text search over claim and reference
        #[arg(short, long)]
        query: Option<String>,

        /// Only rows with this gold label
        #[arg(long)]
        label: Option<String>,
    },
}

/// Execute dataset commands
pub async fn execute(ctx: &Context, cmd: DatasetsCommands) -> Result<()> {
    match cmd.command {
        DatasetsSubcommand::Upload { file, name } => upload(ctx, file, name).await,
        DatasetsSubcommand::List { limit, offset } => {
            let params = PaginationParams { limit, offset };
            list(ctx, params).await
        }
        DatasetsSubcommand::Get { id } => get(ctx, id).await,
        DatasetsSubcommand::Rows {
            id,
            limit,
            offset,
            query,
            label,
        } => {
            let mut params = RowsParams::new().with_limit(limit);
            if let Some(offset) = offset {
                params = params.with_offset(offset);
            }
            if let Some(q) = query {
                params = params.with_query(q);
            }
            if let Some(label) = label {
                params = params.with_label(label);
            }
            rows(ctx, id, params).await
        }
    }
}

/// Displayable dataset for output
#[derive(Debug, Serialize)]
struct DatasetDisplay {
    #[serde(flatten)]
    dataset: Dataset,
}

impl From<Dataset> for DatasetDisplay {
    fn from(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

impl TableDisplay for DatasetDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let d = &self.dataset;
        vec![
            Cell::new(d.id),
            Cell::new(&d.name),
            Cell::new(d.kind.to_string()),
            Cell::new(d.row_count),
            Cell::new(
                d.uploaded_at
                    .as_deref()
                    .map(format_relative_time)
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }

    fn display_single(&self) {
        let d = &self.dataset;
        print_section("Dataset");
        print_field("ID", &d.id.to_string());
        print_field("Name", &d.name);
        print_field("Kind", &d.kind.to_string());
        print_field("Rows", &d.row_count.to_string());
        print_optional_field(
            "Uploaded",
            d.uploaded_at.as_deref().map(format_timestamp).as_deref(),
        );
        print_optional_field("File", d.file.as_deref());
    }

    fn display_compact(&self) {
        let d = &self.dataset;
        println!("{}\t{}\t{}\t{}", d.id, d.name, d.kind, d.row_count);
    }
}

/// Displayable dataset row for output
#[derive(Debug, Serialize)]
struct RowDisplay {
    #[serde(flatten)]
    row: DatasetRow,
}

impl TableDisplay for RowDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let r = &self.row;
        vec![
            Cell::new(r.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(truncate(r.claim.as_deref().unwrap_or("-"), 50)),
            Cell::new(truncate(r.reference.as_deref().unwrap_or("-"), 50)),
            Cell::new(r.label.as_deref().map(label_badge).unwrap_or_else(|| "-".into())),
        ]
    }

    fn display_single(&self) {
        let r = &self.row;
        print_section("Row");
        if let Some(id) = r.id {
            print_field("ID", &id.to_string());
        }
        print_optional_field("Claim", r.claim.as_deref());
        print_optional_field("Reference", r.reference.as_deref());
        print_optional_field("Label", r.label.as_deref());
    }

    fn display_compact(&self) {
        let r = &self.row;
        println!(
            "{}\t{}\t{}",
            r.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            r.label.as_deref().unwrap_or("-"),
            truncate(&r.claim.as_deref().unwrap_or("").replace('\n', " "), 80)
        );
    }
}

async fn upload(ctx: &Context, file: PathBuf, name: Option<String>) -> Result<()> {
    let upload = UploadFile::from_path(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if DatasetKind::from_file_name(&upload.file_name).is_none() {
        ctx.output.warning(&format!(
            "{} does not look like CSV, JSON, JSONL or NDJSON; the backend may reject it",
            upload.file_name
        ));
    }

    let client = ctx.create_client()?;

    let spinner = ctx
        .output
        .spinner(&format!("Uploading {}...", upload.file_name));
    let response = client.datasets().upload(upload, name.as_deref()).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let response = response.context("Failed to upload dataset")?;
    ctx.output.success(&format!(
        "Uploaded dataset '{}' (ID {}), {} rows inserted",
        response.dataset.name, response.dataset.id, response.inserted
    ));

    let display = DatasetDisplay::from(response.dataset);
    ctx.output.write(&display)?;

    if !response.sample.is_empty() {
        let sample: Vec<RowDisplay> = response
            .sample
            .into_iter()
            .map(|row| RowDisplay { row })
            .collect();
        ctx.output.info("Sample rows:");
        ctx.output
            .write_list(&sample, &["ID", "Claim", "Reference", "Label"])?;
    }

    Ok(())
}

async fn list(ctx: &Context, params: PaginationParams) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching datasets...");
    let page = client.datasets().list(Some(params)).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let page = page.context("Failed to list datasets")?;
    let has_more = page.has_more();
    let total = page.count;

    let datasets: Vec<DatasetDisplay> = page.results.into_iter().map(Into::into).collect();
    ctx.output
        .write_list(&datasets, &["ID", "Name", "Kind", "Rows", "Uploaded"])?;

    if has_more {
        ctx.output.info(&format!(
            "Showing {} of {} datasets. Use --offset to paginate.",
            datasets.len(),
            total
        ));
    }

    Ok(())
}

async fn get(ctx: &Context, id: i64) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching dataset...");
    let dataset = client.datasets().get(id).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let display: DatasetDisplay = dataset
        .with_context(|| format!("Failed to fetch dataset {}", id))?
        .into();
    ctx.output.write(&display)?;

    Ok(())
}

async fn rows(ctx: &Context, id: i64, params: RowsParams) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching rows...");
    let page = client.datasets().rows(id, &params).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let page = page.with_context(|| format!("Failed to fetch rows of dataset {}", id))?;
    let has_more = page.has_more();
    let total = page.count;

    let rows: Vec<RowDisplay> = page
        .results
        .into_iter()
        .map(|row| RowDisplay { row })
        .collect();
    ctx.output
        .write_list(&rows, &["ID", "Claim", "Reference", "Label"])?;

    if has_more {
        ctx.output.info(&format!(
            "Showing {} of {} rows. Use --offset to paginate.",
            rows.len(),
            total
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> DatasetsSubcommand {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        match cli.command {
            Commands::Datasets(cmd) => cmd.command,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rows_defaults_limit() {
        match parse(&["judge-playground", "datasets", "rows", "7"]) {
            DatasetsSubcommand::Rows {
                id, limit, offset, ..
            } => {
                assert_eq!(id, 7);
                assert_eq!(limit, 20);
                assert_eq!(offset, None);
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_rows_filters() {
        match parse(&[
            "judge-playground",
            "datasets",
            "rows",
            "3",
            "--query",
            "moon",
            "--label",
            "SUPPORTED",
            "--offset",
            "40",
        ]) {
            DatasetsSubcommand::Rows {
                query,
                label,
                offset,
                ..
            } => {
                assert_eq!(query.as_deref(), Some("moon"));
                assert_eq!(label.as_deref(), Some("SUPPORTED"));
                assert_eq!(offset, Some(40));
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_upload_takes_path_and_name() {
        match parse(&[
            "judge-playground",
            "datasets",
            "upload",
            "claims.csv",
            "--name",
            "Claims",
        ]) {
            DatasetsSubcommand::Upload { file, name } => {
                assert_eq!(file, PathBuf::from("claims.csv"));
                assert_eq!(name.as_deref(), Some("Claims"));
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }
}
