//! Generations resource client
//!
//! Text generation against a named model, plus lookup of stored
//! generations. Every generation-shaped response is normalized before it is
//! returned.

use crate::client::{HttpClient, Paginated};
use crate::error::{SdkError, SdkResult};
use crate::normalize::{normalize_generation, resolve_generation_id};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const GENERATE_PATH: &str = "/api/inference/generate/";
const GENERATE_STREAM_PATH: &str = "/api/inference/generate/stream/";
const GENERATIONS_PATH: &str = "/api/generations/";

/// Client for generation operations
#[derive(Debug, Clone)]
pub struct GenerationsClient {
    client: Arc<HttpClient>,
}

impl GenerationsClient {
    /// Create a new generations client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Generate text with `model_slug` for `prompt`
    pub async fn generate(&self, model_slug: &str, prompt: &str) -> SdkResult<Generation> {
        self.generate_with(&GenerateRequest::new(model_slug, prompt))
            .await
    }

    /// Generate text with decoding parameters
    pub async fn generate_with(&self, request: &GenerateRequest) -> SdkResult<Generation> {
        let raw = self.generate_raw(request).await?;
        normalize_generation(&raw)
    }

    /// Generate and return the backend body without normalization.
    ///
    /// Used where the caller needs the original fields, e.g. to extract
    /// candidate text before the output is defaulted.
    pub async fn generate_raw(&self, request: &GenerateRequest) -> SdkResult<Value> {
        self.client.post_value(GENERATE_PATH, request).await
    }

    /// Generate and return only the resolved generation id
    pub async fn generate_id(&self, model_slug: &str, prompt: &str) -> SdkResult<i64> {
        let raw = self
            .generate_raw(&GenerateRequest::new(model_slug, prompt))
            .await?;
        resolve_generation_id(&raw)
    }

    /// Stream generated tokens as they arrive
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> SdkResult<BoxStream<'static, SdkResult<StreamEvent>>> {
        let response = self.client.post_stream(GENERATE_STREAM_PATH, request).await?;
        let mut decoder = SseDecoder::default();

        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .into_iter()
                    .filter_map(|frame| frame.into_event())
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(SdkError::Network(e))],
            })
            .flat_map(stream::iter)
            .boxed();

        Ok(events)
    }

    /// Get a stored generation by id
    pub async fn get(&self, id: i64) -> SdkResult<Generation> {
        let raw: Value = self
            .client
            .get(&format!("{}{}/", GENERATIONS_PATH, id))
            .await?;
        normalize_generation(&raw)
    }

    /// List stored generations
    pub async fn list(&self, params: &GenerationListParams) -> SdkResult<Paginated<Generation>> {
        let page: Paginated<Value> = self
            .client
            .get_with_query(GENERATIONS_PATH, &params.to_query())
            .await?;
        debug!(count = page.count, "listed generations");
        page.try_map(|raw| normalize_generation(&raw))
    }
}

/// Canonical generation shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: i64,
    /// Empty when the backend reported no output text
    pub output: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

/// Either a bare generation id or a generation already in hand
#[derive(Debug, Clone)]
pub enum GenerationRef {
    Id(i64),
    Generation(Generation),
}

impl GenerationRef {
    pub fn id(&self) -> i64 {
        match self {
            GenerationRef::Id(id) => *id,
            GenerationRef::Generation(g) => g.id,
        }
    }

    /// Output text when a full generation is known
    pub fn candidate(&self) -> Option<&str> {
        match self {
            GenerationRef::Id(_) => None,
            GenerationRef::Generation(g) => Some(&g.output),
        }
    }
}

impl From<i64> for GenerationRef {
    fn from(id: i64) -> Self {
        GenerationRef::Id(id)
    }
}

impl From<Generation> for GenerationRef {
    fn from(g: Generation) -> Self {
        GenerationRef::Generation(g)
    }
}

/// Request body for a generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model_slug: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<GenerationParams>,
}

impl GenerateRequest {
    pub fn new(model_slug: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_slug: model_slug.into(),
            prompt: prompt.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }
}

/// Decoding parameters forwarded to the inference backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
}

impl GenerationParams {
    /// True when no parameter is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parameters for listing generations.
///
/// Accepts either limit/offset or page/page_size; the backend only
/// understands the latter, see [`GenerationListParams::to_query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl GenerationListParams {
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

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    /// Translate to page-number paging.
    ///
    /// `limit` overrides `page_size`; `offset` becomes the page containing it
    /// once a page size is known.
    pub fn to_query(&self) -> PageQuery {
        let page_size = self.limit.or(self.page_size);
        let page = match (self.offset, page_size) {
            (Some(offset), Some(size)) if size > 0 => Some(offset / size + 1),
            _ => self.page,
        };

        PageQuery {
            page,
            page_size,
            search: self.search.clone().filter(|s| !s.is_empty()),
            ordering: self.ordering.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Query string sent to the generations list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// One event from the streaming generation endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Start,
    Token(String),
    Error(String),
    Done,
}

/// A raw server-sent event frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Interpret the frame; comments and unknown payloads yield `None`
    pub fn into_event(self) -> Option<SdkResult<StreamEvent>> {
        match self.event.as_deref() {
            Some("start") => Some(Ok(StreamEvent::Start)),
            Some("done") => Some(Ok(StreamEvent::Done)),
            Some("error") => Some(Ok(StreamEvent::Error(self.error_message()))),
            _ if self.data.is_empty() => None,
            _ => {
                let value: Value = match serde_json::from_str(&self.data) {
                    Ok(v) => v,
                    Err(_) => {
                        return Some(Err(SdkError::ContractViolation(format!(
                            "stream frame is not JSON: {}",
                            self.data
                        ))))
                    }
                };
                if let Some(token) = value.get("token").and_then(Value::as_str) {
                    Some(Ok(StreamEvent::Token(token.to_string())))
                } else if value.get("error").is_some() {
                    Some(Ok(StreamEvent::Error(self.error_message())))
                } else {
                    None
                }
            }
        }
    }

    fn error_message(&self) -> String {
        serde_json::from_str::<Value>(&self.data)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| self.data.clone())
    }
}

/// Incremental decoder for `text/event-stream` bodies
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk and return every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&block[..end]);
            if let Some(frame) = parse_frame(&text) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(block: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if frame.event.is_none() && data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::query_pairs;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest::new("gemma3-4b-ollama", "Hello");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model_slug": "gemma3-4b-ollama", "prompt": "Hello"})
        );

        let request = request.with_params(GenerationParams {
            temperature: Some(0.7),
            max_new_tokens: Some(64),
            ..Default::default()
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["params"]["temperature"], 0.7);
        assert_eq!(json["params"]["max_new_tokens"], 64);
        assert!(json["params"].get("top_p").is_none());
    }

    #[test]
    fn test_list_params_omit_unset_search() {
        let params = GenerationListParams::new().with_page_size(10);
        let pairs = query_pairs(&params.to_query()).unwrap();

        assert_eq!(pairs, vec![("page_size".to_string(), "10".to_string())]);
    }

    #[test]
    fn test_limit_offset_translate_to_pages() {
        let params = GenerationListParams::new().with_limit(20).with_offset(45);
        let query = params.to_query();
        assert_eq!(query.page_size, Some(20));
        assert_eq!(query.page, Some(3));

        let params = GenerationListParams::new().with_offset(45);
        assert_eq!(params.to_query().page, None);
    }

    #[test]
    fn test_empty_search_is_dropped() {
        let params = GenerationListParams::new()
            .with_search("")
            .with_ordering("-created_at");
        let query = params.to_query();
        assert_eq!(query.search, None);
        assert_eq!(query.ordering.as_deref(), Some("-created_at"));
    }

    #[test]
    fn test_generation_ref() {
        let r = GenerationRef::from(9);
        assert_eq!(r.id(), 9);
        assert_eq!(r.candidate(), None);
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        let mut frames = decoder.push(b"event: start\ndata: {\"status\":\"start\"}\n\nda");
        frames.extend(decoder.push(b"ta: {\"token\":\"Hel\"}\r\n\r\n"));
        frames.extend(decoder.push(b"data: {\"token\":\"lo\"}\n\nevent: done\ndata: {}\n\n"));

        let events: Vec<StreamEvent> = frames
            .into_iter()
            .filter_map(|f| f.into_event())
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::Start,
                StreamEvent::Token("Hel".to_string()),
                StreamEvent::Token("lo".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn test_sse_error_event() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"event: error\ndata: {\"error\": \"model crashed\"}\n\n");
        let event = frames.into_iter().next().unwrap().into_event().unwrap().unwrap();
        assert_eq!(event, StreamEvent::Error("model crashed".to_string()));
    }

    #[test]
    fn test_sse_comments_are_ignored() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\n").is_empty());
    }
}
