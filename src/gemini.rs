//! Gemini File Search adapter for the [`RemoteStore`] port.
//!
//! Talks to the `v1beta` REST API over `reqwest::blocking`:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | create | `POST /v1beta/fileSearchStores` |
//! | list | `GET /v1beta/fileSearchStores` (paged) |
//! | delete | `DELETE /v1beta/{store}?force=true` |
//! | upload | resumable `POST /upload/v1beta/{store}:uploadToFileSearchStore` |
//! | operation status | `GET /v1beta/{operation}` |
//! | documents | `GET /v1beta/{store}/documents` (paged), `DELETE /v1beta/{document}?force=true` |
//! | answer | `POST /v1beta/models/{model}:generateContent` |
//!
//! # Retry Strategy
//!
//! Every request retries with exponential backoff on transient errors:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - network errors → retry
//! - backoff: 1s, 2s, 4s, ... (capped at 2^5)

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use store_harness_core::error::{HarnessError, Result};
use store_harness_core::models::{
    Answer, Citation, GenerationOptions, OperationHandle, OperationStatus, RemoteDocument,
    RemoteStoreInfo,
};
use store_harness_core::store::RemoteStore;

use crate::config::RemoteConfig;

/// Citation excerpts are cut to this many characters.
const CITATION_EXCERPT_CHARS: usize = 200;
const PAGE_SIZE: u32 = 20;

/// Blocking client for the Gemini File Search API.
///
/// The API key is read once from the environment variable named by
/// [`RemoteConfig::api_key_env`].
pub struct GeminiFileSearch {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl GeminiFileSearch {
    /// Build an adapter using the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Configuration`] when the variable is unset or empty.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                HarnessError::Configuration(format!(
                    "{} environment variable not set",
                    config.api_key_env
                ))
            })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &RemoteConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(HarnessError::service)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, path)
    }

    /// Send a request built fresh on every attempt and decode a JSON body.
    fn send_json(&self, what: &str, build: impl Fn() -> RequestBuilder) -> Result<Value> {
        let response = self.send(what, build)?;
        let text = response.text().map_err(HarnessError::service)?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn send(
        &self,
        what: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(what, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            match build().header("x-goog-api-key", &self.api_key).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let body_text = response.text().unwrap_or_default();
                    let err =
                        HarnessError::Service(format!("{} failed: {} {}", what, status, body_text));

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(what, attempt, %status, "transient store error");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    tracing::warn!(what, attempt, error = %e, "store request failed");
                    last_err = Some(HarnessError::Service(format!("{} failed: {}", what, e)));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| HarnessError::Service(format!("{} failed after retries", what))))
    }

    fn paged(&self, what: &str, path: &str, field: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = self.api_url(path);
            let json = self.send_json(what, || {
                let mut req = self
                    .client
                    .get(&url)
                    .query(&[("pageSize", PAGE_SIZE.to_string())]);
                if let Some(token) = &page_token {
                    req = req.query(&[("pageToken", token)]);
                }
                req
            })?;
            if let Some(page) = json.get(field).and_then(|v| v.as_array()) {
                items.extend(page.iter().cloned());
            }
            match json.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(items)
    }
}

impl RemoteStore for GeminiFileSearch {
    fn create(&self, display_name: &str) -> Result<String> {
        let url = self.api_url("fileSearchStores");
        let body = json!({ "displayName": display_name });
        let json = self.send_json("create store", || self.client.post(&url).json(&body))?;
        json.get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| HarnessError::Service("create store: response missing name".into()))
    }

    fn upload_to_store(
        &self,
        path: &Path,
        identifier: &str,
        display_name: &str,
        mime_type: &str,
    ) -> Result<OperationHandle> {
        let bytes = std::fs::read(path)?;

        let start_url = format!(
            "{}/upload/v1beta/{}:uploadToFileSearchStore",
            self.base_url, identifier
        );
        let metadata = json!({ "displayName": display_name, "mimeType": mime_type });
        let start = self.send("start upload", || {
            self.client
                .post(&start_url)
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
                .header("X-Goog-Upload-Header-Content-Type", mime_type)
                .json(&metadata)
        })?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HarnessError::Service("start upload: missing upload url".into()))?;

        let json = self.send_json("upload bytes", || {
            self.client
                .post(&upload_url)
                .header("X-Goog-Upload-Command", "upload, finalize")
                .header("X-Goog-Upload-Offset", "0")
                .body(bytes.clone())
        })?;
        parse_operation_handle(&json)
    }

    fn operation_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let url = self.api_url(&handle.name);
        let json = self.send_json("get operation", || self.client.get(&url))?;
        Ok(parse_operation_status(&json))
    }

    fn list(&self) -> Result<Vec<RemoteStoreInfo>> {
        let items = self.paged("list stores", "fileSearchStores", "fileSearchStores")?;
        Ok(items.iter().filter_map(parse_store_info).collect())
    }

    fn delete(&self, identifier: &str) -> Result<()> {
        let url = self.api_url(identifier);
        self.send("delete store", || {
            self.client.delete(&url).query(&[("force", "true")])
        })?;
        Ok(())
    }

    fn list_documents(&self, identifier: &str) -> Result<Vec<RemoteDocument>> {
        let path = format!("{}/documents", identifier);
        let items = self.paged("list documents", &path, "documents")?;
        Ok(items.iter().filter_map(parse_document).collect())
    }

    fn delete_document(&self, document_name: &str) -> Result<()> {
        let url = self.api_url(document_name);
        self.send("delete document", || {
            self.client.delete(&url).query(&[("force", "true")])
        })?;
        Ok(())
    }

    fn generate_answer(
        &self,
        identifier: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Answer> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        let url = self.api_url(&format!("models/{}:generateContent", model));
        let body = generate_request_body(identifier, prompt, options.temperature);
        let json = self.send_json("generate answer", || self.client.post(&url).json(&body))?;
        parse_answer(&json)
    }
}

fn generate_request_body(identifier: Option<&str>, prompt: &str, temperature: Option<f32>) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });
    if let Some(store) = identifier {
        body["tools"] = json!([{ "fileSearch": { "fileSearchStoreNames": [store] } }]);
    }
    if let Some(t) = temperature {
        body["generationConfig"] = json!({ "temperature": t });
    }
    body
}

fn parse_operation_handle(json: &Value) -> Result<OperationHandle> {
    json.get("name")
        .and_then(|v| v.as_str())
        .map(|name| OperationHandle {
            name: name.to_string(),
        })
        .ok_or_else(|| HarnessError::Service("upload: response missing operation name".into()))
}

/// Decode a long-running operation. A missing `done` means still pending.
fn parse_operation_status(json: &Value) -> OperationStatus {
    let done = json.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
    if !done {
        return OperationStatus::pending();
    }
    match json.get("error") {
        Some(err) if !err.is_null() => {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            OperationStatus::failed(message)
        }
        _ => OperationStatus::succeeded(),
    }
}

fn parse_store_info(json: &Value) -> Option<RemoteStoreInfo> {
    let identifier = json.get("name")?.as_str()?.to_string();
    let display_name = json
        .get("displayName")
        .and_then(|v| v.as_str())
        .unwrap_or("N/A")
        .to_string();
    Some(RemoteStoreInfo {
        identifier,
        display_name,
    })
}

fn parse_document(json: &Value) -> Option<RemoteDocument> {
    let name = json.get("name")?.as_str()?.to_string();
    // int64 fields arrive as JSON strings
    let size_bytes = match json.get("sizeBytes") {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(v) => v.as_u64().unwrap_or(0),
        None => 0,
    };
    Some(RemoteDocument {
        display_name: json
            .get("displayName")
            .and_then(|v| v.as_str())
            .unwrap_or(&name)
            .to_string(),
        name,
        size_bytes,
        state: json
            .get("state")
            .and_then(|v| v.as_str())
            .unwrap_or("STATE_UNSPECIFIED")
            .to_string(),
    })
}

fn parse_answer(json: &Value) -> Result<Answer> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| HarnessError::Service("generate answer: no candidates".into()))?;

    let text = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let citations = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(|c| c.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .map(|chunk| {
                    let ctx = chunk.get("retrievedContext").unwrap_or(chunk);
                    Citation {
                        source: ctx
                            .get("title")
                            .and_then(|t| t.as_str())
                            .unwrap_or("unknown")
                            .to_string(),
                        content: ctx
                            .get("text")
                            .and_then(|t| t.as_str())
                            .unwrap_or("")
                            .chars()
                            .take(CITATION_EXCERPT_CHARS)
                            .collect(),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Answer { text, citations })
}
