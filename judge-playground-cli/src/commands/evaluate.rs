//! Metrics and judge commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use judge_playground_sdk::{
    CombinedRequest, CombinedResult, JudgeRequest, JudgeSamplingRequest, JudgeSamplingResult,
    JudgeScores, MetricScores, MetricsResult, RejudgeRequest, ScoreRequest, ScoredGeneration,
};
use serde::Serialize;

use crate::context::Context;
use crate::output::{
    format_judge_score, format_unit, print_field, print_section, truncate, TableDisplay,
};

/// Classic metric commands
#[derive(Debug, Args)]
pub struct MetricsCommands {
    #[command(subcommand)]
    pub command: MetricsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum MetricsSubcommand {
    /// Score a stored generation against a reference
    Generation {
        /// Generation ID
        id: i64,

        /// Reference answer
        #[arg(short, long)]
        reference: String,
    },

    /// Score ad hoc text against a reference
    Text {
        /// Candidate text
        #[arg(short, long)]
        candidate: String,

        /// Reference answer
        #[arg(short, long)]
        reference: String,
    },
}

/// Judge commands
#[derive(Debug, Args)]
pub struct JudgeCommands {
    #[command(subcommand)]
    pub command: JudgeSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum JudgeSubcommand {
    /// Rubric scores (correctness, relevance, fluency, overall) for a generation
    Score {
        /// Generation ID
        id: i64,

        /// Reference answer
        #[arg(short, long)]
        reference: String,

        /// Candidate text; when omitted the backend uses the stored output
        #[arg(short, long)]
        candidate: Option<String>,

        /// Judge model
        #[arg(short, long)]
        judge_model: Option<String>,
    },

    /// Multi-dimension judge with token probabilities
    Sample {
        /// Candidate text
        #[arg(short, long)]
        candidate: String,

        /// Reference answer
        #[arg(short, long)]
        reference: String,

        /// Judge model repository id
        #[arg(short, long)]
        model_name: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Nucleus sampling threshold
        #[arg(long)]
        top_p: Option<f64>,

        /// Top-k sampling
        #[arg(long)]
        top_k: Option<u32>,
    },

    /// Metrics and judge in one backend call
    Combined {
        /// Generation ID
        id: i64,

        /// Reference answer
        #[arg(short, long)]
        reference: String,

        /// Judge model
        #[arg(short, long)]
        judge_model: Option<String>,
    },

    /// Re-run the judge over stored generations
    Rejudge {
        /// Generation IDs
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Reference answer
        #[arg(short, long)]
        reference: String,

        /// Judge model
        #[arg(short, long)]
        judge_model: Option<String>,

        /// Judge prompt version
        #[arg(long)]
        prompt_version: Option<String>,
    },
}

/// Arguments for `run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Model slug (defaults to the configured default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Prompt text
    #[arg(short, long)]
    pub prompt: String,

    /// Reference answer
    #[arg(short, long)]
    pub reference: String,

    /// Judge model
    #[arg(short, long)]
    pub judge_model: Option<String>,
}

/// Displayable metrics for output
#[derive(Debug, Serialize)]
pub(crate) struct MetricsDisplay {
    evaluation_id: Option<i64>,
    metrics: MetricScores,
}

impl From<MetricsResult> for MetricsDisplay {
    fn from(r: MetricsResult) -> Self {
        Self {
            evaluation_id: Some(r.evaluation_id),
            metrics: r.metrics,
        }
    }
}

pub(crate) fn print_metrics(metrics: &MetricScores) {
    let mut any = false;
    for (name, value) in metrics.iter() {
        print_field(name, &format_unit(value));
        any = true;
    }
    if !any {
        println!("  {}", "no metrics reported".dimmed());
    }
}

impl TableDisplay for MetricsDisplay {
    fn to_row(&self) -> Vec<Cell> {
        let cell = |v: Option<f64>| Cell::new(v.map(format_unit).unwrap_or_else(|| "-".into()));
        vec![
            Cell::new(
                self.evaluation_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            cell(self.metrics.bleu),
            cell(self.metrics.rouge1),
            cell(self.metrics.rouge_l),
            cell(self.metrics.cosine),
        ]
    }

    fn display_single(&self) {
        print_section("Metrics");
        if let Some(id) = self.evaluation_id {
            print_field("Evaluation", &id.to_string());
        }
        print_metrics(&self.metrics);
    }

    fn display_compact(&self) {
        let parts: Vec<String> = self
            .metrics
            .iter()
            .map(|(name, v)| format!("{}={:.4}", name, v))
            .collect();
        println!("{}", parts.join(" "));
    }
}

/// Displayable judge scores for output
#[derive(Debug, Serialize)]
pub(crate) struct JudgeDisplay {
    #[serde(flatten)]
    scores: JudgeScores,
}

impl From<JudgeScores> for JudgeDisplay {
    fn from(scores: JudgeScores) -> Self {
        Self { scores }
    }
}

pub(crate) fn print_judge(scores: &JudgeScores) {
    for (name, value) in scores.clamped().iter() {
        print_field(name, &format_judge_score(value));
    }
}

impl TableDisplay for JudgeDisplay {
    fn to_row(&self) -> Vec<Cell> {
        self.scores
            .clamped()
            .iter()
            .map(|(_, v)| Cell::new(format!("{:.1}", v)))
            .collect()
    }

    fn display_single(&self) {
        print_section("Judge");
        print_judge(&self.scores);
    }

    fn display_compact(&self) {
        let parts: Vec<String> = self
            .scores
            .iter()
            .map(|(name, v)| format!("{}={:.1}", name, v))
            .collect();
        println!("{}", parts.join(" "));
    }
}

#[derive(Debug, Serialize)]
struct CombinedDisplay {
    #[serde(flatten)]
    result: CombinedResult,
}

impl TableDisplay for CombinedDisplay {
    fn to_row(&self) -> Vec<Cell> {
        vec![Cell::new(self.result.evaluation_id)]
    }

    fn display_single(&self) {
        print_section("Evaluation");
        print_field("ID", &self.result.evaluation_id.to_string());
        print_section("Metrics");
        print_metrics(&self.result.metrics);
        if let Some(scores) = &self.result.judge_scores {
            print_section("Judge");
            print_judge(scores);
        }
    }

    fn display_compact(&self) {
        let judge = self
            .result
            .judge_scores
            .map(|s| format!("{:.1}", s.overall))
            .unwrap_or_else(|| "-".to_string());
        println!("{}\toverall={}", self.result.evaluation_id, judge);
    }
}

#[derive(Debug, Serialize)]
struct SamplingDisplay {
    #[serde(flatten)]
    result: JudgeSamplingResult,
}

impl TableDisplay for SamplingDisplay {
    fn to_row(&self) -> Vec<Cell> {
        vec![Cell::new(self.result.model_name.as_deref().unwrap_or("-"))]
    }

    fn display_single(&self) {
        print_section("Sampling judge");
        if let Some(model) = &self.result.model_name {
            print_field("Model", model);
        }

        if let Some(error) = self.result.scores.error() {
            println!("  {} {}", "judge output unparseable:".red(), error);
        } else {
            print_section("Scores (1-5)");
            for (dimension, score) in self.result.scores.dimension_scores() {
                print_field(&dimension, &score.to_string());
            }
        }

        if !self.result.dimensions.is_empty() {
            print_section("Token distributions");
            for dimension in &self.result.dimensions {
                let tokens: Vec<String> = dimension
                    .top_tokens
                    .iter()
                    .map(|t| format!("{}:{:.2}", t.token, t.prob))
                    .collect();
                print_field(&dimension.dimension, &tokens.join("  "));
            }
        }
    }

    fn display_compact(&self) {
        let parts: Vec<String> = self
            .result
            .scores
            .dimension_scores()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!("{}", parts.join(" "));
    }
}

#[derive(Debug, Serialize)]
struct ScoredDisplay {
    #[serde(flatten)]
    scored: ScoredGeneration,
}

impl TableDisplay for ScoredDisplay {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.scored.generation_id),
            Cell::new(truncate(&self.scored.generation.output, 60)),
            Cell::new(format!("{:.1}", self.scored.judge.overall)),
        ]
    }

    fn display_single(&self) {
        let g = &self.scored.generation;
        print_section("Generation");
        print_field("ID", &self.scored.generation_id.to_string());
        if let Some(model) = &g.model {
            print_field("Model", model);
        }
        println!("\n{}", g.output);

        print_section("Metrics");
        print_metrics(&self.scored.metrics.metrics);
        print_section("Judge");
        print_judge(&self.scored.judge);
    }

    fn display_compact(&self) {
        println!(
            "{}\toverall={:.1}\t{}",
            self.scored.generation_id,
            self.scored.judge.overall,
            truncate(&self.scored.generation.output.replace('\n', " "), 80)
        );
    }
}

/// Execute metrics commands
pub async fn metrics(ctx: &Context, cmd: MetricsCommands) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Computing metrics...");
    let result = match &cmd.command {
        MetricsSubcommand::Generation { id, reference } => client
            .evaluations()
            .metrics(*id, reference)
            .await
            .with_context(|| format!("Metrics failed for generation {}", id)),
        MetricsSubcommand::Text {
            candidate,
            reference,
        } => client
            .evaluations()
            .text_metrics(candidate, reference)
            .await
            .context("Metrics failed"),
    };

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let display: MetricsDisplay = result?.into();
    ctx.output.write(&display)
}

/// Execute judge commands
pub async fn judge(ctx: &Context, cmd: JudgeCommands) -> Result<()> {
    let client = ctx.create_client()?;

    match cmd.command {
        JudgeSubcommand::Score {
            id,
            reference,
            candidate,
            judge_model,
        } => {
            let request = JudgeRequest {
                generation_id: id,
                reference,
                candidate,
                judge_model: ctx.judge_model(judge_model),
            };

            let spinner = ctx.output.spinner("Judging...");
            let scores = client.evaluations().judge(&request).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }

            let display: JudgeDisplay = scores
                .with_context(|| format!("Judge failed for generation {}", id))?
                .into();
            ctx.output.write(&display)
        }
        JudgeSubcommand::Sample {
            candidate,
            reference,
            model_name,
            temperature,
            top_p,
            top_k,
        } => {
            let mut request = JudgeSamplingRequest::new(candidate, reference);
            if let Some(m) = model_name {
                request = request.with_model(m);
            }
            if let Some(t) = temperature {
                request = request.with_temperature(t);
            }
            if let Some(p) = top_p {
                request = request.with_top_p(p);
            }
            if let Some(k) = top_k {
                request = request.with_top_k(k);
            }

            let spinner = ctx
                .output
                .spinner(&format!("Sampling judge {}...", request.model_name));
            let result = client.evaluations().judge_sampling(&request).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }

            ctx.output.write(&SamplingDisplay {
                result: result.context("Sampling judge failed")?,
            })
        }
        JudgeSubcommand::Combined {
            id,
            reference,
            judge_model,
        } => {
            let mut request = CombinedRequest::new(id, reference);
            request.judge_model = ctx.judge_model(judge_model);

            let spinner = ctx.output.spinner("Evaluating...");
            let result = client.evaluations().combined(&request).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }

            ctx.output.write(&CombinedDisplay {
                result: result.with_context(|| format!("Evaluation failed for generation {}", id))?,
            })
        }
        JudgeSubcommand::Rejudge {
            ids,
            reference,
            judge_model,
            prompt_version,
        } => {
            let mut request = RejudgeRequest::new(ids, reference);
            request.judge_model = ctx.judge_model(judge_model);
            request.prompt_version = prompt_version;

            let spinner = ctx
                .output
                .spinner(&format!("Re-judging {} generation(s)...", request.generation_ids.len()));
            let result = client.evaluations().rejudge(&request).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }

            let result = result.context("Re-judge failed")?;
            match ctx.output_format() {
                crate::output::OutputFormat::Table => {
                    for status in &result.results {
                        print_field(&status.generation_id.to_string(), &status.status);
                    }
                    Ok(())
                }
                _ => ctx.output.write_value(&result),
            }
        }
    }
}

/// Generate, then score with metrics and the judge
pub async fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let client = ctx.create_client()?;

    let mut request = ScoreRequest::new(ctx.model(args.model)?, args.prompt, args.reference);
    request.judge_model = ctx.judge_model(args.judge_model);

    let spinner = ctx
        .output
        .spinner(&format!("Generating with {} and scoring...", request.model_slug));
    let scored = client.generate_then_score(&request).await;
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    ctx.output.write(&ScoredDisplay {
        scored: scored.context("Generate-then-score failed")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_judge_score_candidate_is_optional() {
        let cli = Cli::try_parse_from(["judge-playground", "judge", "score", "4", "-r", "ref"]).unwrap();
        match cli.command {
            Commands::Judge(JudgeCommands {
                command: JudgeSubcommand::Score { id, candidate, .. },
            }) => {
                assert_eq!(id, 4);
                assert!(candidate.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejudge_requires_ids() {
        assert!(Cli::try_parse_from(["judge-playground", "judge", "rejudge", "-r", "ref"]).is_err());
    }
}
