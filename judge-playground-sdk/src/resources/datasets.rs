//! Datasets resource client
//!
//! This module provides methods for uploading and browsing datasets.

use crate::client::{HttpClient, Paginated, PaginationParams};
use crate::error::{SdkError, SdkResult};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DATASETS_PATH: &str = "/api/datasets/";
const UPLOAD_PATH: &str = "/api/datasets/upload/";

/// Client for dataset operations
#[derive(Debug, Clone)]
pub struct DatasetsClient {
    client: Arc<HttpClient>,
}

impl DatasetsClient {
    /// Create a new datasets client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Upload a CSV/JSON/JSONL/NDJSON file as a new dataset
    pub async fn upload(
        &self,
        file: UploadFile,
        name: Option<&str>,
    ) -> SdkResult<DatasetUploadResponse> {
        info!(file = %file.file_name, bytes = file.bytes.len(), "uploading dataset");

        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let mut form = Form::new().part("file", part);
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            form = form.text("name", name.to_string());
        }

        self.client.post_multipart(UPLOAD_PATH, form).await
    }

    /// List datasets
    pub async fn list(&self, params: Option<PaginationParams>) -> SdkResult<Paginated<Dataset>> {
        match params {
            Some(p) => self.client.get_with_query(DATASETS_PATH, &p).await,
            None => self.client.get(DATASETS_PATH).await,
        }
    }

    /// Get a dataset by ID
    pub async fn get(&self, id: i64) -> SdkResult<Dataset> {
        self.client
            .get(&format!("{}{}/", DATASETS_PATH, id))
            .await
    }

    /// List the rows of a dataset
    pub async fn rows(&self, id: i64, params: &RowsParams) -> SdkResult<Paginated<DatasetRow>> {
        self.client
            .get_with_query(&format!("{}{}/rows/", DATASETS_PATH, id), params)
            .await
    }
}

/// A file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its base name
    pub async fn from_path(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SdkError::InvalidRequest(format!("{} has no usable file name", path.display()))
            })?
            .to_string();

        if DatasetKind::from_file_name(&file_name).is_none() {
            return Err(SdkError::InvalidRequest(format!(
                "unsupported dataset file type: {} (expected csv, json, jsonl or ndjson)",
                file_name
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }
}

/// Dataset file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Csv,
    Json,
    Jsonl,
    Ndjson,
}

impl DatasetKind {
    /// Infer the kind from a file extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
            Self::Jsonl => write!(f, "jsonl"),
            Self::Ndjson => write!(f, "ndjson"),
        }
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("Unknown dataset kind: {}", s)),
        }
    }
}

/// Dataset entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub name: String,
    pub kind: DatasetKind,
    #[serde(default)]
    pub row_count: u64,
    /// The backend serializes this as `created_at`
    #[serde(alias = "created_at", default)]
    pub uploaded_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// A stored dataset row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub claim: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Response to a dataset upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetUploadResponse {
    pub dataset: Dataset,
    #[serde(default)]
    pub inserted: u64,
    /// A preview of the first few rows
    #[serde(default)]
    pub sample: Vec<DatasetRow>,
}

/// Parameters for listing dataset rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowsParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Case-insensitive text search over claim and reference
    pub q: Option<String>,
    /// Exact label filter
    pub label: Option<String>,
}

impl RowsParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dataset_kind_parsing() {
        assert_eq!("csv".parse::<DatasetKind>().unwrap(), DatasetKind::Csv);
        assert_eq!("NDJSON".parse::<DatasetKind>().unwrap(), DatasetKind::Ndjson);
        assert!("parquet".parse::<DatasetKind>().is_err());
        assert_eq!(DatasetKind::from_file_name("claims.jsonl"), Some(DatasetKind::Jsonl));
        assert_eq!(DatasetKind::from_file_name("claims"), None);
    }

    #[test]
    fn test_dataset_accepts_created_at() {
        let dataset: Dataset = serde_json::from_value(json!({
            "id": 3,
            "name": "fever-dev",
            "file": "datasets/fever.csv",
            "kind": "csv",
            "row_count": 120,
            "created_at": "2025-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(dataset.uploaded_at.as_deref(), Some("2025-03-01T10:00:00Z"));
        assert_eq!(dataset.kind, DatasetKind::Csv);
    }

    #[test]
    fn test_upload_response_parsing() {
        let response: DatasetUploadResponse = serde_json::from_value(json!({
            "dataset": {"id": 1, "name": "d", "kind": "json", "row_count": 2, "uploaded_at": "t"},
            "inserted": 2,
            "sample": [{"claim": "c", "reference": "r"}]
        }))
        .unwrap();

        assert_eq!(response.inserted, 2);
        assert_eq!(response.sample[0].label, None);
    }

    #[tokio::test]
    async fn test_upload_file_rejects_unknown_extension() {
        let err = UploadFile::from_path("/tmp/data.parquet").await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidRequest(_)));
    }
}
