//! Dataset labeling client
//!
//! Runs a model over dataset rows, either returning the per-row results as
//! JSON or as a CSV file written to disk. Both variants hit the same endpoint
//! and differ only in the `format` field of the payload.

use crate::client::HttpClient;
use crate::error::{SdkError, SdkResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const LABEL_PATH: &str = "/api/inference/label_dataset/";

/// File name used when neither the response nor the caller provides one
pub const DEFAULT_CSV_FILENAME: &str = "labels.csv";

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]+)""#).expect("static regex"));

/// Client for dataset labeling
#[derive(Debug, Clone)]
pub struct LabelingClient {
    client: Arc<HttpClient>,
}

impl LabelingClient {
    /// Create a new labeling client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Label rows and return the results as JSON
    pub async fn label_json(
        &self,
        request: &LabelDatasetRequest,
    ) -> SdkResult<Vec<LabelDatasetRowResult>> {
        let payload = FormattedRequest {
            request,
            format: LabelFormat::Json,
        };
        self.client.post(LABEL_PATH, &payload).await
    }

    /// Label rows and fetch the CSV rendition without saving it
    pub async fn fetch_csv(&self, request: &LabelDatasetRequest) -> SdkResult<LabeledCsv> {
        let payload = FormattedRequest {
            request,
            format: LabelFormat::Csv,
        };
        let response = self.client.post_raw(LABEL_PATH, &payload).await?;

        Ok(LabeledCsv {
            suggested_filename: response
                .header("content-disposition")
                .and_then(filename_from_content_disposition),
            bytes: response.bytes,
        })
    }

    /// Label rows and save the CSV into `dir`.
    ///
    /// The file is named from the response's `Content-Disposition`, else
    /// `default_filename`, else [`DEFAULT_CSV_FILENAME`].
    pub async fn download_csv(
        &self,
        request: &LabelDatasetRequest,
        dir: impl AsRef<Path>,
        default_filename: Option<&str>,
    ) -> SdkResult<SavedFile> {
        self.fetch_csv(request)
            .await?
            .save_to(dir, default_filename)
            .await
    }
}

/// Which labeling dataset rows to run, and with which model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDatasetRequest {
    pub dataset_id: i64,
    pub model_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl LabelDatasetRequest {
    pub fn new(dataset_id: i64, model_slug: impl Into<String>) -> Self {
        Self {
            dataset_id,
            model_slug: model_slug.into(),
            limit: None,
            offset: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum LabelFormat {
    Json,
    Csv,
}

#[derive(Serialize)]
struct FormattedRequest<'a> {
    #[serde(flatten)]
    request: &'a LabelDatasetRequest,
    format: LabelFormat,
}

/// One labeled row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDatasetRowResult {
    pub row_id: i64,
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub gold_label: Option<String>,
    #[serde(default)]
    pub pred_label: Option<String>,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub model_slug: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    /// Client-assigned sequence number, see [`annotate_synthetic_ids`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<i64>,
}

/// Number labeled rows 1, 2, 3, ... in order.
///
/// The labeling preview does not persist generations, so these ids exist
/// only on the client. They are not durable and must not be treated as
/// backend generation ids outside a batch evaluation of the same rows.
pub fn annotate_synthetic_ids(rows: &mut [LabelDatasetRowResult]) {
    for (idx, row) in rows.iter_mut().enumerate() {
        row.generation_id = Some(idx as i64 + 1);
    }
}

/// Extract the quoted filename from a `Content-Disposition` header
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    FILENAME_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reduce a server-suggested name to a bare file name
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

/// A labeled CSV held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledCsv {
    /// Name from `Content-Disposition`, if the backend sent one
    pub suggested_filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl LabeledCsv {
    /// The name this CSV will be saved under
    pub fn filename(&self, default_filename: Option<&str>) -> String {
        self.suggested_filename
            .as_deref()
            .and_then(sanitize_filename)
            .or_else(|| default_filename.and_then(sanitize_filename))
            .unwrap_or_else(|| DEFAULT_CSV_FILENAME.to_string())
    }

    /// Write the CSV into `dir`, returning where it went
    pub async fn save_to(
        self,
        dir: impl AsRef<Path>,
        default_filename: Option<&str>,
    ) -> SdkResult<SavedFile> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SdkError::InvalidRequest(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let filename = self.filename(default_filename);
        let path = dir.join(&filename);
        let bytes_written = self.bytes.len();
        tokio::fs::write(&path, self.bytes).await?;

        info!(path = %path.display(), bytes = bytes_written, "saved labeled CSV");
        Ok(SavedFile {
            path,
            filename,
            bytes_written,
        })
    }
}

/// A file written by the SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub filename: String,
    pub bytes_written: usize,
}
