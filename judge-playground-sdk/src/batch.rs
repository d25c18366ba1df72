//! Batch evaluation over labeled dataset rows
//!
//! Rows are processed one after another. A row that cannot be evaluated
//! records its error and the batch moves on; the output has one entry per
//! input row, in input order.

use crate::resources::evaluations::{EvaluationsClient, JudgeRequest, JudgeScores, MetricScores};
use crate::resources::labeling::LabelDatasetRowResult;
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome of evaluating one row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome<T> {
    pub row: LabelDatasetRowResult,
    #[serde(flatten)]
    pub result: RowResult<T>,
}

/// Value or error message for one row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowResult<T> {
    Ok(T),
    Error(String),
}

impl<T> RowOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self.result, RowResult::Ok(_))
    }

    pub fn value(&self) -> Option<&T> {
        match &self.result {
            RowResult::Ok(v) => Some(v),
            RowResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.result {
            RowResult::Ok(_) => None,
            RowResult::Error(e) => Some(e),
        }
    }
}

/// Compare each row's justification with its reference using classic metrics.
///
/// Goes through the ad hoc text endpoint, so synthetic generation ids are
/// never looked up on the backend.
pub async fn evaluate_rows_metrics(
    evaluations: &EvaluationsClient,
    rows: &[LabelDatasetRowResult],
) -> Vec<RowOutcome<MetricScores>> {
    let mut outcomes = Vec::with_capacity(rows.len());

    for row in rows {
        let justification = row.justification.as_deref().filter(|j| !j.is_empty());
        let result = match justification {
            Some(candidate) if !row.reference.is_empty() => {
                match evaluations.text_metrics(candidate, &row.reference).await {
                    Ok(r) => RowResult::Ok(r.metrics),
                    Err(e) => {
                        warn!(row_id = row.row_id, error = %e, "metrics failed for row");
                        RowResult::Error(e.to_string())
                    }
                }
            }
            _ => RowResult::Error("missing justification or reference".to_string()),
        };

        outcomes.push(RowOutcome {
            row: row.clone(),
            result,
        });
    }

    debug!(rows = outcomes.len(), "batch metrics complete");
    outcomes
}

/// Judge each row's justification against its reference.
///
/// Rows need a `generation_id` (see
/// [`annotate_synthetic_ids`](crate::resources::labeling::annotate_synthetic_ids));
/// the justification is always sent as the candidate.
pub async fn judge_rows(
    evaluations: &EvaluationsClient,
    rows: &[LabelDatasetRowResult],
    judge_model: Option<&str>,
) -> Vec<RowOutcome<JudgeScores>> {
    let mut outcomes = Vec::with_capacity(rows.len());

    for row in rows {
        let result = match row.generation_id {
            Some(id) if !row.reference.is_empty() => {
                let mut request = JudgeRequest::new(id, row.reference.clone());
                request.candidate = row.justification.clone();
                request.judge_model = judge_model.map(str::to_string);

                match evaluations.judge(&request).await {
                    Ok(scores) => RowResult::Ok(scores),
                    Err(e) => {
                        warn!(row_id = row.row_id, error = %e, "judge failed for row");
                        RowResult::Error(e.to_string())
                    }
                }
            }
            _ => RowResult::Error("missing generation_id or reference".to_string()),
        };

        outcomes.push(RowOutcome {
            row: row.clone(),
            result,
        });
    }

    debug!(rows = outcomes.len(), "batch judge complete");
    outcomes
}

/// Mean of each judge dimension over the successful rows
pub fn mean_judge_scores(outcomes: &[RowOutcome<JudgeScores>]) -> Option<JudgeScores> {
    let ok: Vec<&JudgeScores> = outcomes.iter().filter_map(RowOutcome::value).collect();
    if ok.is_empty() {
        return None;
    }
    let n = ok.len() as f64;
    let mean = |f: fn(&JudgeScores) -> f64| ok.iter().map(|s| f(s)).sum::<f64>() / n;

    Some(JudgeScores {
        correctness: mean(|s| s.correctness),
        relevance: mean(|s| s.relevance),
        fluency: mean(|s| s.fluency),
        overall: mean(|s| s.overall),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(result: RowResult<JudgeScores>) -> RowOutcome<JudgeScores> {
        RowOutcome {
            row: LabelDatasetRowResult {
                row_id: 1,
                claim: String::new(),
                reference: String::new(),
                gold_label: None,
                pred_label: None,
                justification: None,
                model_slug: None,
                latency_ms: None,
                generation_id: None,
            },
            result,
        }
    }

    #[test]
    fn test_mean_skips_failed_rows() {
        let scores = |v: f64| JudgeScores {
            correctness: v,
            relevance: v,
            fluency: v,
            overall: v,
        };
        let outcomes = vec![
            outcome(RowResult::Ok(scores(8.0))),
            outcome(RowResult::Error("boom".to_string())),
            outcome(RowResult::Ok(scores(6.0))),
        ];

        let mean = mean_judge_scores(&outcomes).unwrap();
        assert_eq!(mean.overall, 7.0);
        assert_eq!(outcomes[1].error(), Some("boom"));
        assert!(!outcomes[1].is_ok());
    }

    #[test]
    fn test_mean_of_nothing() {
        assert!(mean_judge_scores(&[]).is_none());
    }
}
