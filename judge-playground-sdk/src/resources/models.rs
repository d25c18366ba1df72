//! Models resource client
//!
//! The inference model catalog used to populate model pickers.

use crate::client::HttpClient;
use crate::error::SdkResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const MODELS_PATH: &str = "/api/models/";

/// Client for model catalog operations
#[derive(Debug, Clone)]
pub struct ModelsClient {
    client: Arc<HttpClient>,
}

impl ModelsClient {
    /// Create a new models client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// List the inference models the backend can serve.
    ///
    /// An empty catalog (or an empty body) is a valid answer; what to do
    /// without models is up to the caller.
    pub async fn list(&self) -> SdkResult<Vec<InferenceModel>> {
        let value: Value = self.client.get(MODELS_PATH).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        crate::client::decode(value)
    }

    /// List only the models marked active
    pub async fn list_active(&self) -> SdkResult<Vec<InferenceModel>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect())
    }
}

/// Model catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceModel {
    pub slug: String,
    pub repo_id: String,
    pub backend: String,
    /// The catalog endpoint only lists servable models, so absent means active
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl InferenceModel {
    /// Display name, falling back to the slug
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.slug)
    }
}

fn default_active() -> bool {
    true
}
