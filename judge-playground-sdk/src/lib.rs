//! Judge Playground SDK
//!
//! This crate provides a Rust client for the Judge Playground LLM-evaluation
//! backend. It covers text generation, classic metrics (BLEU/ROUGE/cosine),
//! LLM-as-judge scoring, dataset upload and model-driven dataset labeling.
//!
//! # Features
//!
//! - **Canonical shapes**: generation responses are normalized at the client
//!   edge, whatever field names the backend endpoint uses
//! - **Typed errors**: HTTP, network and contract failures are distinct
//!   [`SdkError`] variants with a status/network discriminant
//! - **One metric scale**: classic metrics are always returned on [0,1]
//! - **No retries**: a failed call surfaces immediately to the caller
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use judge_playground_sdk::{JudgePlaygroundClient, ScoreRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads API_BASE, falling back to http://127.0.0.1:8000
//!     let client = JudgePlaygroundClient::from_env()?;
//!
//!     let scored = client
//!         .generate_then_score(&ScoreRequest::new(
//!             "gemma3-4b-ollama",
//!             "Who wrote Dune?",
//!             "Frank Herbert wrote Dune.",
//!         ))
//!         .await?;
//!
//!     println!("generation {}: {}", scored.generation_id, scored.generation.output);
//!     println!("overall judge score: {}", scored.judge.overall);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use judge_playground_sdk::{JudgePlaygroundClient, SdkError};
//!
//! async fn show(client: &JudgePlaygroundClient) {
//!     match client.generations().get(42).await {
//!         Ok(g) => println!("{}", g.output),
//!         Err(e) if e.is_network_error() => eprintln!("backend unreachable: {}", e),
//!         Err(SdkError::Http { status: 404, message, .. }) => eprintln!("not found: {}", message),
//!         Err(e) => eprintln!("failed: {}", e),
//!     }
//! }
//! ```

#![deny(unsafe_code)]

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod resources;

// Re-export main types for convenience
pub use client::{HttpClient, Paginated, PaginationParams, RawResponse};
pub use config::{api_base, SdkConfig, SdkConfigBuilder};
pub use error::{SdkError, SdkResult};
pub use normalize::{extract_candidate, normalize_generation, resolve_generation_id};

// Re-export resource clients
pub use resources::datasets::{
    Dataset, DatasetKind, DatasetRow, DatasetUploadResponse, DatasetsClient, RowsParams,
    UploadFile,
};
pub use resources::evaluations::{
    CombinedRequest, CombinedResult, DimensionResult, EvaluationsClient, JudgeRequest,
    JudgeSamplingRequest, JudgeSamplingResult, JudgeScores, MetricKind, MetricScores,
    MetricsResult, RejudgeRequest, RejudgeResult, SamplingScores, TokenProb,
};
pub use resources::generations::{
    GenerateRequest, Generation, GenerationListParams, GenerationParams, GenerationRef,
    GenerationsClient, StreamEvent,
};
pub use resources::labeling::{
    annotate_synthetic_ids, LabelDatasetRequest, LabelDatasetRowResult, LabeledCsv,
    LabelingClient, SavedFile,
};
pub use resources::models::{InferenceModel, ModelsClient};

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The main client for the Judge Playground API.
///
/// Resource clients share one connection pool; cloning the client is cheap.
///
/// # Example
///
/// ```rust,no_run
/// use judge_playground_sdk::JudgePlaygroundClient;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), judge_playground_sdk::SdkError> {
/// let client = JudgePlaygroundClient::builder("http://localhost:8000")
///     .with_timeout(Duration::from_secs(30))
///     .build()?;
///
/// let _generations = client.generations();
/// let _evaluations = client.evaluations();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JudgePlaygroundClient {
    http_client: Arc<HttpClient>,
    generations: GenerationsClient,
    evaluations: EvaluationsClient,
    datasets: DatasetsClient,
    models: ModelsClient,
    labeling: LabelingClient,
}

impl JudgePlaygroundClient {
    /// Create a new client with the given configuration.
    ///
    /// Fails with [`SdkError::Configuration`] when the configuration is invalid.
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        let http_client = Arc::new(HttpClient::new(config)?);

        Ok(Self {
            generations: GenerationsClient::new(Arc::clone(&http_client)),
            evaluations: EvaluationsClient::new(Arc::clone(&http_client)),
            datasets: DatasetsClient::new(Arc::clone(&http_client)),
            models: ModelsClient::new(Arc::clone(&http_client)),
            labeling: LabelingClient::new(Arc::clone(&http_client)),
            http_client,
        })
    }

    /// Create a client for the process-wide base URL (see [`api_base`])
    pub fn from_env() -> SdkResult<Self> {
        Self::new(SdkConfig::from_env())
    }

    /// Create a new client using a builder pattern.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Text generation and stored generations
    pub fn generations(&self) -> &GenerationsClient {
        &self.generations
    }

    /// Metrics and judge scoring
    pub fn evaluations(&self) -> &EvaluationsClient {
        &self.evaluations
    }

    /// Dataset upload and browsing
    pub fn datasets(&self) -> &DatasetsClient {
        &self.datasets
    }

    /// The inference model catalog
    pub fn models(&self) -> &ModelsClient {
        &self.models
    }

    /// Model-driven dataset labeling
    pub fn labeling(&self) -> &LabelingClient {
        &self.labeling
    }

    /// Get a reference to the underlying HTTP client.
    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Get the base URL of the API.
    pub fn base_url(&self) -> &str {
        &self.http_client.config().base_url
    }

    /// Liveness check against the backend root.
    ///
    /// Any HTTP answer counts as connected, whatever its status or body.
    /// Never returns an error: transport failures are reported as
    /// [`ConnectionStatus::Error`].
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.http_client.ping().await {
            Ok(status) => {
                info!(status = status.as_u16(), "backend reachable");
                ConnectionStatus::Connected {
                    status: status.as_u16(),
                }
            }
            Err(e) => {
                warn!(error = %e, "backend unreachable");
                ConnectionStatus::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Generate, then score the generation with metrics and the judge.
    ///
    /// Generation always completes first. Metrics and judge then run
    /// concurrently; if either fails the whole call fails and no partial
    /// result is returned. A failed generation never reaches the scoring
    /// endpoints.
    pub async fn generate_then_score(&self, request: &ScoreRequest) -> SdkResult<ScoredGeneration> {
        let generate = GenerateRequest::new(&request.model_slug, &request.prompt);
        let raw = self.generations.generate_raw(&generate).await?;

        let generation_id = resolve_generation_id(&raw)?;
        let candidate = extract_candidate(&raw);
        let generation = normalize_generation(&raw)?;
        info!(generation_id, model = %request.model_slug, "generated, scoring");

        let judge_request = JudgeRequest {
            generation_id,
            reference: request.reference.clone(),
            candidate,
            judge_model: request.judge_model.clone(),
        };

        let (metrics, judge) = tokio::try_join!(
            self.evaluations.metrics(generation_id, &request.reference),
            self.evaluations.judge(&judge_request),
        )?;
        info!(generation_id, overall = judge.overall, "scored generation");

        Ok(ScoredGeneration {
            generation_id,
            generation,
            metrics,
            judge,
        })
    }
}

/// Outcome of [`JudgePlaygroundClient::test_connection`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected { status: u16 },
    Error { message: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }
}

/// Input for [`JudgePlaygroundClient::generate_then_score`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRequest {
    pub model_slug: String,
    pub prompt: String,
    pub reference: String,
    pub judge_model: Option<String>,
}

impl ScoreRequest {
    pub fn new(
        model_slug: impl Into<String>,
        prompt: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            model_slug: model_slug.into(),
            prompt: prompt.into(),
            reference: reference.into(),
            judge_model: None,
        }
    }

    pub fn with_judge_model(mut self, judge_model: impl Into<String>) -> Self {
        self.judge_model = Some(judge_model.into());
        self
    }
}

/// A generation with both of its scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredGeneration {
    pub generation_id: i64,
    pub generation: Generation,
    pub metrics: MetricsResult,
    pub judge: JudgeScores,
}

/// Builder for creating a [`JudgePlaygroundClient`] with fluent configuration.
#[derive(Debug)]
pub struct ClientBuilder {
    config_builder: SdkConfigBuilder,
}

impl ClientBuilder {
    /// Create a new client builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config_builder: SdkConfig::builder(base_url),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.connect_timeout(timeout);
        self
    }

    /// Enable or disable request/response logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.config_builder = self.config_builder.logging(enable);
        self
    }

    /// Add a custom header to all requests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Build the client.
    pub fn build(self) -> SdkResult<JudgePlaygroundClient> {
        JudgePlaygroundClient::new(self.config_builder.build())
    }
}
