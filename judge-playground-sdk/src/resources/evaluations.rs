//! Evaluations resource client
//!
//! Classic text-similarity metrics and LLM-as-judge scoring.
//!
//! Metric values are returned on the unit interval. The backend reports BLEU
//! on a 0-100 scale and ROUGE/cosine on 0-1; [`MetricScores::to_unit_scale`]
//! reconciles the two before anything leaves this module.

use crate::client::HttpClient;
use crate::error::SdkResult;
use crate::resources::generations::GenerationRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Full scale of the backend's BLEU
const BLEU_SCALE: f64 = 100.0;

const EVALUATE_PATH: &str = "/api/evaluate/";
const JUDGE_PATH: &str = "/api/evaluate/judge/";
const COMBINED_PATH: &str = "/api/evaluate/combined/";
const REJUDGE_PATH: &str = "/api/evaluate/rejudge/";
const JUDGE_SAMPLING_PATH: &str = "/api/judge/evaluate/";

/// The metric set requested for every classic evaluation
pub const DEFAULT_METRICS: [MetricKind; 3] = [MetricKind::Bleu, MetricKind::Rouge, MetricKind::Cosine];

/// Judge model used by the sampling endpoint when none is given
pub const DEFAULT_SAMPLING_MODEL: &str = "Qwen/Qwen2.5-1.5B-Instruct";

/// Client for evaluation operations
#[derive(Debug, Clone)]
pub struct EvaluationsClient {
    client: Arc<HttpClient>,
}

impl EvaluationsClient {
    /// Create a new evaluations client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Compute BLEU/ROUGE/cosine for a stored generation against `reference`
    pub async fn metrics(&self, generation_id: i64, reference: &str) -> SdkResult<MetricsResult> {
        let request = MetricsRequest {
            generation_id: Some(generation_id),
            candidate: None,
            reference: reference.to_string(),
            metrics: DEFAULT_METRICS.to_vec(),
        };
        let result: MetricsResult = self.client.post(EVALUATE_PATH, &request).await?;
        Ok(result.to_unit_scale())
    }

    /// Compute metrics for ad hoc text, without a stored generation
    pub async fn text_metrics(&self, candidate: &str, reference: &str) -> SdkResult<MetricsResult> {
        let request = MetricsRequest {
            generation_id: None,
            candidate: Some(candidate.to_string()),
            reference: reference.to_string(),
            metrics: DEFAULT_METRICS.to_vec(),
        };
        let result: MetricsResult = self.client.post(EVALUATE_PATH, &request).await?;
        Ok(result.to_unit_scale())
    }

    /// Metrics for a generation given either by id or in full
    pub async fn metrics_for(
        &self,
        generation: &GenerationRef,
        reference: &str,
    ) -> SdkResult<MetricsResult> {
        self.metrics(generation.id(), reference).await
    }

    /// Score a generation with the LLM judge.
    ///
    /// When `request.candidate` is `None` the backend loads the stored output.
    pub async fn judge(&self, request: &JudgeRequest) -> SdkResult<JudgeScores> {
        self.client.post(JUDGE_PATH, request).await
    }

    /// Judge a generation given either by id or in full.
    ///
    /// A full generation supplies its output as the candidate; a bare id
    /// leaves the candidate to the backend.
    pub async fn judge_for(
        &self,
        generation: &GenerationRef,
        reference: &str,
        judge_model: Option<&str>,
    ) -> SdkResult<JudgeScores> {
        let mut request = JudgeRequest::new(generation.id(), reference);
        request.candidate = generation.candidate().map(str::to_string);
        request.judge_model = judge_model.map(str::to_string);
        self.judge(&request).await
    }

    /// Metrics plus optional judge in a single backend call
    pub async fn combined(&self, request: &CombinedRequest) -> SdkResult<CombinedResult> {
        let result: CombinedResult = self.client.post(COMBINED_PATH, request).await?;
        Ok(CombinedResult {
            metrics: result.metrics.to_unit_scale(),
            ..result
        })
    }

    /// Re-run the judge over several stored generations
    pub async fn rejudge(&self, request: &RejudgeRequest) -> SdkResult<RejudgeResult> {
        self.client.post(REJUDGE_PATH, request).await
    }

    /// Multi-dimension judge with token probability distributions
    pub async fn judge_sampling(
        &self,
        request: &JudgeSamplingRequest,
    ) -> SdkResult<JudgeSamplingResult> {
        self.client.post(JUDGE_SAMPLING_PATH, request).await
    }
}

/// Classic metric families understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Bleu,
    Rouge,
    Cosine,
}

#[derive(Debug, Clone, Serialize)]
struct MetricsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    reference: String,
    metrics: Vec<MetricKind>,
}

/// Classic metric scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rouge1: Option<f64>,
    #[serde(default, rename = "rougeL", skip_serializing_if = "Option::is_none")]
    pub rouge_l: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cosine: Option<f64>,
    /// Any further metrics the backend reports
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MetricScores {
    /// Convert to the canonical unit scale.
    ///
    /// BLEU always arrives on 0-100 and is divided by 100. Every value is
    /// then clamped into [0, 1]; non-finite values are dropped.
    pub fn to_unit_scale(&self) -> Self {
        let bleu = self.bleu.map(|b| b / BLEU_SCALE);
        Self {
            bleu: bleu.and_then(clamp_unit),
            rouge1: self.rouge1.and_then(clamp_unit),
            rouge_l: self.rouge_l.and_then(clamp_unit),
            cosine: self.cosine.and_then(clamp_unit),
            extra: self.extra.clone(),
        }
    }

    /// Named values in display order, skipping those not reported
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        [
            ("bleu", self.bleu),
            ("rouge1", self.rouge1),
            ("rougeL", self.rouge_l),
            ("cosine", self.cosine),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
    }
}

/// Clamp a value into [0, 1]
pub fn clamp_unit(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// Result of a classic metrics evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub evaluation_id: i64,
    pub metrics: MetricScores,
}

impl MetricsResult {
    /// Same result with metrics on the unit scale
    pub fn to_unit_scale(&self) -> Self {
        Self {
            evaluation_id: self.evaluation_id,
            metrics: self.metrics.to_unit_scale(),
        }
    }
}

/// Request body for the LLM judge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeRequest {
    pub generation_id: i64,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
}

impl JudgeRequest {
    pub fn new(generation_id: i64, reference: impl Into<String>) -> Self {
        Self {
            generation_id,
            reference: reference.into(),
            candidate: None,
            judge_model: None,
        }
    }

    pub fn with_candidate(mut self, candidate: impl Into<String>) -> Self {
        self.candidate = Some(candidate.into());
        self
    }

    pub fn with_judge_model(mut self, judge_model: impl Into<String>) -> Self {
        self.judge_model = Some(judge_model.into());
        self
    }
}

/// Judge rubric, each dimension on [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgeScores {
    pub correctness: f64,
    pub relevance: f64,
    pub fluency: f64,
    pub overall: f64,
}

impl JudgeScores {
    /// Upper bound of every judge dimension
    pub const MAX: f64 = 10.0;

    /// Scores clamped into [0, 10]
    pub fn clamped(&self) -> Self {
        let c = |v: f64| if v.is_finite() { v.clamp(0.0, Self::MAX) } else { 0.0 };
        Self {
            correctness: c(self.correctness),
            relevance: c(self.relevance),
            fluency: c(self.fluency),
            overall: c(self.overall),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("correctness", self.correctness),
            ("relevance", self.relevance),
            ("fluency", self.fluency),
            ("overall", self.overall),
        ]
        .into_iter()
    }
}

/// Request body for a combined metrics + judge evaluation
#[derive(Debug, Clone, Serialize)]
pub struct CombinedRequest {
    pub generation_id: i64,
    pub reference: String,
    pub metrics: Vec<MetricKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
}

impl CombinedRequest {
    pub fn new(generation_id: i64, reference: impl Into<String>) -> Self {
        Self {
            generation_id,
            reference: reference.into(),
            metrics: DEFAULT_METRICS.to_vec(),
            judge_model: None,
        }
    }

    pub fn with_judge_model(mut self, judge_model: impl Into<String>) -> Self {
        self.judge_model = Some(judge_model.into());
        self
    }
}

/// Result of a combined evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub evaluation_id: i64,
    pub metrics: MetricScores,
    #[serde(default)]
    pub judge_scores: Option<JudgeScores>,
}

/// Request body for re-judging stored generations
#[derive(Debug, Clone, Serialize)]
pub struct RejudgeRequest {
    pub generation_ids: Vec<i64>,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,
}

impl RejudgeRequest {
    pub fn new(generation_ids: Vec<i64>, reference: impl Into<String>) -> Self {
        Self {
            generation_ids,
            reference: reference.into(),
            judge_model: None,
            prompt_version: None,
        }
    }
}

/// Per-generation outcome of a re-judge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejudgeStatus {
    pub generation_id: i64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejudgeResult {
    pub results: Vec<RejudgeStatus>,
}

/// Request body for the sampling judge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeSamplingRequest {
    pub candidate: String,
    pub reference: String,
    pub model_name: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
}

impl JudgeSamplingRequest {
    pub fn new(candidate: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            reference: reference.into(),
            model_name: DEFAULT_SAMPLING_MODEL.to_string(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Probability the judge assigned to one score token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenProb {
    pub token: String,
    pub prob: f64,
}

/// Token distribution for one rubric dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: String,
    #[serde(default)]
    pub top_tokens: Vec<TokenProb>,
}

impl DimensionResult {
    /// The most probable token, if any
    pub fn most_likely(&self) -> Option<&TokenProb> {
        self.top_tokens
            .iter()
            .max_by(|a, b| a.prob.total_cmp(&b.prob))
    }
}

/// Scores block of a sampling result.
///
/// The backend passes the judge's JSON through unchanged, so this may hold an
/// error object instead of scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SamplingScores(pub BTreeMap<String, Value>);

impl SamplingScores {
    /// Dimensions with an integral score in 1..=5
    pub fn dimension_scores(&self) -> BTreeMap<String, u8> {
        self.0
            .iter()
            .filter_map(|(k, v)| {
                let score = v.as_u64().or_else(|| {
                    v.as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as u64)
                })?;
                (1..=5).contains(&score).then(|| (k.clone(), score as u8))
            })
            .collect()
    }

    /// The judge's parse failure, if it reported one
    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }
}

/// Result of the sampling judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSamplingResult {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub scores: SamplingScores,
    #[serde(default)]
    pub dimensions: Vec<DimensionResult>,
}
