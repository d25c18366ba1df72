//! Dataset labeling commands

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use comfy_table::Cell;
use judge_playground_sdk::batch::{self, RowOutcome};
use judge_playground_sdk::{
    annotate_synthetic_ids, JudgeScores, LabelDatasetRequest, LabelDatasetRowResult, MetricScores,
};
use serde::Serialize;

use crate::commands::evaluate::{print_judge, print_metrics};
use crate::context::Context;
use crate::output::{
    format_bytes, format_judge_score, format_unit, label_badge, print_field,
    print_optional_field, print_section, truncate, TableDisplay,
};

/// Labeling commands
#[derive(Debug, Args)]
pub struct LabelCommands {
    #[command(subcommand)]
    pub command: LabelSubcommand,
}

/// Rows to label
#[derive(Debug, Args)]
pub struct LabelTarget {
    /// Dataset ID
    #[arg(short, long)]
    pub dataset: i64,

    /// Model slug (defaults to the configured default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum number of rows to label
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Number of rows to skip
    #[arg(long)]
    pub offset: Option<u32>,
}

/// Evaluation to run over labeled rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Evaluation {
    /// Compare each justification with its reference
    Metrics,
    /// Score each justification with the judge
    Judge,
}

#[derive(Debug, Subcommand)]
pub enum LabelSubcommand {
    /// Label rows and show the results
    Preview {
        #[command(flatten)]
        target: LabelTarget,

        /// Evaluate the labeled rows
        #[arg(short, long, value_enum)]
        evaluate: Option<Evaluation>,

        /// Judge model (defaults to the configured judge_model)
        #[arg(short, long)]
        judge_model: Option<String>,
    },

    /// Label rows and save the results as CSV
    Download {
        #[command(flatten)]
        target: LabelTarget,

        /// Directory to save into
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// File name used when the backend does not suggest one
        #[arg(short, long)]
        filename: Option<String>,
    },
}

/// Execute labeling commands
pub async fn execute(ctx: &Context, cmd: LabelCommands) -> Result<()> {
    match cmd.command {
        LabelSubcommand::Preview {
            target,
            evaluate,
            judge_model,
        } => {
            let request = build_request(ctx, target)?;
            preview(ctx, &request, evaluate, ctx.judge_model(judge_model)).await
        }
        LabelSubcommand::Download {
            target,
            out,
            filename,
        } => {
            let request = build_request(ctx, target)?;
            download(ctx, &request, out, filename).await
        }
    }
}

fn build_request(ctx: &Context, target: LabelTarget) -> Result<LabelDatasetRequest> {
    let model = ctx.model(target.model)?;
    let mut request = LabelDatasetRequest::new(target.dataset, model);
    if let Some(limit) = target.limit {
        request = request.with_limit(limit);
    }
    if let Some(offset) = target.offset {
        request = request.with_offset(offset);
    }
    Ok(request)
}

/// Displayable labeled row for output
#[derive(Debug, Serialize)]
struct LabeledRowDisplay {
    #[serde(flatten)]
    row: LabelDatasetRowResult,
}

fn opt_badge(label: Option<&str>) -> String {
    label.map(label_badge).unwrap_or_else(|| "-".to_string())
}

impl TableDisplay for LabeledRowDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let r = &self.row;
        vec![
            Cell::new(r.row_id),
            Cell::new(truncate(&r.claim, 40)),
            Cell::new(opt_badge(r.gold_label.as_deref())),
            Cell::new(opt_badge(r.pred_label.as_deref())),
            Cell::new(truncate(r.justification.as_deref().unwrap_or("-"), 50)),
            Cell::new(
                r.latency_ms
                    .map(|ms| format!("{} ms", ms))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }

    fn display_single(&self) {
        let r = &self.row;
        print_section(&format!("Row {}", r.row_id));
        print_field("Claim", &r.claim);
        print_field("Reference", &r.reference);
        print_optional_field("Gold", r.gold_label.as_deref());
        print_optional_field("Predicted", r.pred_label.as_deref());
        print_optional_field("Justification", r.justification.as_deref());
        print_optional_field("Model", r.model_slug.as_deref());
    }

    fn display_compact(&self) {
        let r = &self.row;
        println!(
            "{}\t{}\t{}",
            r.row_id,
            r.gold_label.as_deref().unwrap_or("-"),
            r.pred_label.as_deref().unwrap_or("-")
        );
    }
}

/// Displayable per-row evaluation for output
#[derive(Debug, Serialize)]
struct OutcomeDisplay<T> {
    #[serde(flatten)]
    outcome: RowOutcome<T>,
}

impl TableDisplay for OutcomeDisplay<MetricScores> {
    fn to_row(&self) -> Vec<Cell> {
        let o = &self.outcome;
        let score = |v: Option<f64>| v.map(format_unit).unwrap_or_else(|| "-".to_string());
        match o.value() {
            Some(m) => vec![
                Cell::new(o.row.row_id),
                Cell::new(opt_badge(o.row.pred_label.as_deref())),
                Cell::new(score(m.bleu)),
                Cell::new(score(m.rouge1)),
                Cell::new(score(m.rouge_l)),
                Cell::new(score(m.cosine)),
            ],
            None => error_row(o),
        }
    }

    fn display_single(&self) {
        print_section(&format!("Row {}", self.outcome.row.row_id));
        match self.outcome.value() {
            Some(m) => print_metrics(m),
            None => print_optional_field("Error", self.outcome.error()),
        }
    }

    fn display_compact(&self) {
        let o = &self.outcome;
        match o.value() {
            Some(m) => println!(
                "{}\t{}",
                o.row.row_id,
                m.iter()
                    .map(|(name, v)| format!("{}={:.3}", name, v))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            None => println!("{}\terror: {}", o.row.row_id, o.error().unwrap_or("")),
        }
    }
}

impl TableDisplay for OutcomeDisplay<JudgeScores> {
    fn to_row(&self) -> Vec<Cell> {
        let o = &self.outcome;
        match o.value().map(JudgeScores::clamped) {
            Some(s) => vec![
                Cell::new(o.row.row_id),
                Cell::new(opt_badge(o.row.pred_label.as_deref())),
                Cell::new(format_judge_score(s.correctness)),
                Cell::new(format_judge_score(s.relevance)),
                Cell::new(format_judge_score(s.fluency)),
                Cell::new(format_judge_score(s.overall)),
            ],
            None => error_row(o),
        }
    }

    fn display_single(&self) {
        print_section(&format!("Row {}", self.outcome.row.row_id));
        match self.outcome.value() {
            Some(s) => print_judge(s),
            None => print_optional_field("Error", self.outcome.error()),
        }
    }

    fn display_compact(&self) {
        let o = &self.outcome;
        match o.value() {
            Some(s) => println!("{}\t{:.1}", o.row.row_id, s.clamped().overall),
            None => println!("{}\terror: {}", o.row.row_id, o.error().unwrap_or("")),
        }
    }
}

fn error_row<T>(outcome: &RowOutcome<T>) -> Vec<Cell> {
    vec![
        Cell::new(outcome.row.row_id),
        Cell::new(opt_badge(outcome.row.pred_label.as_deref())),
        Cell::new(format!("error: {}", outcome.error().unwrap_or("unknown"))),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
    ]
}

fn report_failures<T>(ctx: &Context, outcomes: &[RowOutcome<T>]) {
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        ctx.output.error(&format!(
            "{} of {} rows could not be evaluated",
            failed,
            outcomes.len()
        ));
    }
}

async fn preview(
    ctx: &Context,
    request: &LabelDatasetRequest,
    evaluate: Option<Evaluation>,
    judge_model: Option<String>,
) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner(&format!(
        "Labeling dataset {} with {}...",
        request.dataset_id, request.model_slug
    ));
    let rows = client.labeling().label_json(request).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let mut rows = rows
        .with_context(|| format!("Failed to label dataset {}", request.dataset_id))?;
    if rows.is_empty() {
        ctx.output.warning("No rows were labeled");
        return Ok(());
    }
    annotate_synthetic_ids(&mut rows);

    let Some(evaluation) = evaluate else {
        let display: Vec<LabeledRowDisplay> = rows
            .into_iter()
            .map(|row| LabeledRowDisplay { row })
            .collect();
        return ctx.output.write_list(
            &display,
            &["Row", "Claim", "Gold", "Predicted", "Justification", "Latency"],
        );
    };

    let spinner = ctx
        .output
        .spinner(&format!("Evaluating {} rows...", rows.len()));

    match evaluation {
        Evaluation::Metrics => {
            let outcomes = batch::evaluate_rows_metrics(client.evaluations(), &rows).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            report_failures(ctx, &outcomes);

            let display: Vec<OutcomeDisplay<MetricScores>> = outcomes
                .into_iter()
                .map(|outcome| OutcomeDisplay { outcome })
                .collect();
            ctx.output.write_list(
                &display,
                &["Row", "Predicted", "BLEU", "ROUGE-1", "ROUGE-L", "Cosine"],
            )
        }
        Evaluation::Judge => {
            let outcomes =
                batch::judge_rows(client.evaluations(), &rows, judge_model.as_deref()).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            report_failures(ctx, &outcomes);
            let mean = batch::mean_judge_scores(&outcomes);

            let display: Vec<OutcomeDisplay<JudgeScores>> = outcomes
                .into_iter()
                .map(|outcome| OutcomeDisplay { outcome })
                .collect();
            ctx.output.write_list(
                &display,
                &["Row", "Predicted", "Correctness", "Relevance", "Fluency", "Overall"],
            )?;

            if let Some(mean) = mean {
                ctx.output.info(&format!(
                    "Mean overall {} across {} rows",
                    format_judge_score(mean.clamped().overall),
                    display.iter().filter(|d| d.outcome.is_ok()).count()
                ));
            }
            Ok(())
        }
    }
}

async fn download(
    ctx: &Context,
    request: &LabelDatasetRequest,
    out: PathBuf,
    filename: Option<String>,
) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner(&format!(
        "Labeling dataset {} with {}...",
        request.dataset_id, request.model_slug
    ));
    let saved = client
        .labeling()
        .download_csv(request, &out, filename.as_deref())
        .await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let saved = saved.with_context(|| {
        format!(
            "Failed to download labels for dataset {}",
            request.dataset_id
        )
    })?;
    ctx.output.success(&format!(
        "Saved {} ({})",
        saved.path.display(),
        format_bytes(saved.bytes_written as u64)
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> LabelSubcommand {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        match cli.command {
            Commands::Label(cmd) => cmd.command,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_preview_with_judge() {
        match parse(&[
            "judge-playground",
            "label",
            "preview",
            "--dataset",
            "4",
            "-m",
            "tiny",
            "--limit",
            "5",
            "--evaluate",
            "judge",
        ]) {
            LabelSubcommand::Preview {
                target, evaluate, ..
            } => {
                assert_eq!(target.dataset, 4);
                assert_eq!(target.model.as_deref(), Some("tiny"));
                assert_eq!(target.limit, Some(5));
                assert_eq!(evaluate, Some(Evaluation::Judge));
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_download_defaults_to_current_dir() {
        match parse(&["judge-playground", "label", "download", "--dataset", "2"]) {
            LabelSubcommand::Download {
                out,
                filename,
                target,
            } => {
                assert_eq!(out, PathBuf::from("."));
                assert!(filename.is_none());
                assert!(target.model.is_none());
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_dataset_is_required() {
        assert!(Cli::try_parse_from(["judge-playground", "label", "preview"]).is_err());
    }

    #[test]
    fn test_unknown_evaluation_is_rejected() {
        assert!(Cli::try_parse_from([
            "judge-playground",
            "label",
            "preview",
            "--dataset",
            "1",
            "--evaluate",
            "bleu",
        ])
        .is_err());
    }

    #[test]
    fn test_error_row_has_full_width() {
        let outcome: RowOutcome<JudgeScores> = RowOutcome {
            row: LabelDatasetRowResult {
                row_id: 9,
                claim: "c".into(),
                reference: String::new(),
                gold_label: None,
                pred_label: Some("SUPPORTED".into()),
                justification: None,
                model_slug: None,
                latency_ms: None,
                generation_id: Some(1),
            },
            result: batch::RowResult::Error("missing generation_id or reference".into()),
        };
        assert_eq!(error_row(&outcome).len(), 6);
    }
}
