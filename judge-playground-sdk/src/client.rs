//! HTTP client implementation
//!
//! This module provides the request helpers every resource client goes
//! through: URL building, JSON GET/POST, multipart upload, raw (non-JSON)
//! downloads and the response-to-error mapping.

use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

const JSON: &str = "application/json";
const PREVIEW_CHARS: usize = 200;

/// The HTTP client for making API requests
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<SdkConfig>,
}

/// A successful response whose body was not interpreted as JSON
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body
    pub bytes: Vec<u8>,
}

impl RawResponse {
    /// Get a header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        config.validate()?;

        // Content-Type is set per request so multipart bodies keep their boundary.
        let mut headers = header::HeaderMap::new();
        for (name, value) in &config.custom_headers {
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::try_from(name.as_str()),
                header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, value);
            }
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(SdkError::Network)?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Build the full URL for an endpoint
    pub fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Build the full URL for an endpoint with query parameters.
    ///
    /// `query` must serialize to a flat object. Null members are omitted,
    /// every other scalar is stringified.
    pub fn url_with_query<Q: Serialize>(&self, path: &str, query: Option<&Q>) -> SdkResult<Url> {
        let mut url = Url::parse(&self.url(path))?;
        if let Some(q) = query {
            let pairs = query_pairs(q)?;
            if !pairs.is_empty() {
                let mut serializer = url.query_pairs_mut();
                for (k, v) in &pairs {
                    serializer.append_pair(k, v);
                }
            }
        }
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SdkResult<T> {
        decode(self.get_value(path, Option::<&()>::None).await?)
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> SdkResult<T> {
        decode(self.get_value(path, Some(query)).await?)
    }

    /// Make a GET request and return the parsed body untyped
    pub async fn get_value<Q: Serialize>(&self, path: &str, query: Option<&Q>) -> SdkResult<Value> {
        let url = self.url_with_query(path, query)?;
        let request = self
            .client
            .request(Method::GET, url.clone())
            .header(header::ACCEPT, JSON)
            .header(header::CONTENT_TYPE, JSON);
        let response = self.send(request, &Method::GET, url.as_str(), None).await?;
        self.read_json(response).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> SdkResult<T> {
        decode(self.post_value(path, body).await?)
    }

    /// Make a POST request and return the parsed body untyped
    pub async fn post_value<B: Serialize>(&self, path: &str, body: &B) -> SdkResult<Value> {
        let response = self.send_json(path, body, JSON).await?;
        self.read_json(response).await
    }

    /// Make a multipart POST request.
    ///
    /// No JSON content type is set; reqwest supplies the multipart boundary.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> SdkResult<T> {
        let url = self.url(path);
        let request = self
            .client
            .request(Method::POST, &url)
            .header(header::ACCEPT, JSON)
            .multipart(form);
        let response = self.send(request, &Method::POST, &url, None).await?;
        decode(self.read_json(response).await?)
    }

    /// Make a JSON POST request that accepts any response content type.
    ///
    /// Non-2xx statuses still become [`SdkError::Http`], with the message
    /// chosen as for JSON requests.
    pub async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> SdkResult<RawResponse> {
        let response = self.send_json(path, body, "*/*").await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let text = response.text().await.map_err(SdkError::Network)?;
            let json = serde_json::from_str::<Value>(&text)
                .ok()
                .filter(|v| !v.is_null());
            warn!(status = status.as_u16(), "request failed");
            return Err(SdkError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &text,
                json,
            ));
        }

        let bytes = response.bytes().await.map_err(SdkError::Network)?.to_vec();
        if self.config.enable_logging {
            debug!(status = status.as_u16(), bytes = bytes.len(), "raw response received");
        }

        Ok(RawResponse {
            status: status.as_u16(),
            headers,
            bytes,
        })
    }

    /// Make a JSON POST request and hand back the live response for streaming.
    ///
    /// Non-2xx statuses are read and mapped to errors before returning.
    pub async fn post_stream<B: Serialize>(&self, path: &str, body: &B) -> SdkResult<Response> {
        let response = self.send_json(path, body, "text/event-stream").await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(match self.read_json(response).await {
                Err(e) => e,
                Ok(_) => SdkError::ContractViolation("error status with success body".to_string()),
            })
        }
    }

    /// GET the backend root and report the status, whatever the body.
    pub async fn ping(&self) -> SdkResult<StatusCode> {
        let url = self.url("/");
        let request = self.client.request(Method::GET, &url);
        let response = self.send(request, &Method::GET, &url, None).await?;
        debug!(status = response.status().as_u16(), "backend ping");
        Ok(response.status())
    }

    async fn send_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        accept: &'static str,
    ) -> SdkResult<Response> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body)?;
        let request = self
            .client
            .request(Method::POST, &url)
            .header(header::ACCEPT, accept)
            .header(header::CONTENT_TYPE, JSON)
            .body(payload.clone());
        self.send(request, &Method::POST, &url, Some(&payload)).await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> SdkResult<Response> {
        if self.config.enable_logging {
            debug!("Request: {} {}", method, url);
            if let Some(body) = body {
                debug!("Request body: {}", preview(&String::from_utf8_lossy(body)));
            }
        }

        request.send().await.map_err(|e| {
            error!("Request failed: {} {}: {}", method, url, e);
            SdkError::Network(e)
        })
    }

    /// Read the body as text, then interpret it as JSON.
    async fn read_json(&self, response: Response) -> SdkResult<Value> {
        let status = response.status();
        let text = response.text().await.map_err(SdkError::Network)?;

        if self.config.enable_logging {
            debug!("Response {}: {}", status.as_u16(), preview(&text));
        }

        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "request failed");
            return Err(SdkError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &text,
                parsed.ok().filter(|v| !v.is_null()),
            ));
        }

        parsed.map_err(|e| {
            error!("JSON parse error: {}", e);
            SdkError::InvalidResponse {
                status: status.as_u16(),
                body: text,
            }
        })
    }
}

/// Deserialize an untyped body into the expected shape.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> SdkResult<T> {
    serde_json::from_value(value)
        .map_err(|e| SdkError::ContractViolation(format!("unexpected response shape: {}", e)))
}

/// Flatten a serializable value into query pairs, omitting nulls.
pub fn query_pairs<Q: Serialize + ?Sized>(query: &Q) -> SdkResult<Vec<(String, String)>> {
    match serde_json::to_value(query)? {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (key, value) in map {
                let value = match value {
                    Value::Null => continue,
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(SdkError::InvalidRequest(format!(
                            "query parameter `{}` must be a scalar",
                            key
                        )))
                    }
                };
                pairs.push((key, value));
            }
            Ok(pairs)
        }
        _ => Err(SdkError::InvalidRequest(
            "query parameters must be a map".to_string(),
        )),
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

/// Limit/offset parameters for list requests
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct PaginationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl PaginationParams {
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
}

/// Paginated response wrapper used by every list endpoint
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// True when the backend advertises another page
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Convert every item, keeping the paging links
    pub fn try_map<U, F>(self, f: F) -> SdkResult<Paginated<U>>
    where
        F: FnMut(T) -> SdkResult<U>,
    {
        Ok(Paginated {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect::<SdkResult<_>>()?,
        })
    }
}
