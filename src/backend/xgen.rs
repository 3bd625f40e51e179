//! XGen HTTP Client
//!
//! Talks to an XGen-compatible completion endpoint.
//!
//! - `POST {endpoint}/generate` with `{prompt, max_tokens, stop_sequences}`
//!   answers `{"generated_text": "..."}`
//! - `POST {endpoint}/generate/stream` with a [`ChatRequest`] answers
//!   server-sent events; each `data:` line holds one JSON chunk and
//!   `data: [DONE]` closes the stream

use super::{ChatRequest, ChunkStream, LanguageModel};
use crate::assembly::END_OF_PROMPT_TAG;
use crate::config::Config;
use crate::errors::{HarnessError, HarnessResult};
use crate::stream::StreamChunk;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Header carrying the operation tag of a streamed request
pub const OPERATION_HEADER: &str = "x-operation-tag";

/// XGen completion client
pub struct XGenClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl XGenClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> HarnessResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HarnessError::backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .post(format!("{}/{}", self.endpoint, path))
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Map non-success HTTP statuses to backend errors
async fn check_status(response: Response) -> HarnessResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(HarnessError::backend(match status.as_u16() {
        401 => "Authentication failed - check XGEN_API_KEY".to_string(),
        403 => "Access forbidden - insufficient permissions".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!("Server error ({}): {}", status, body),
        _ => format!("HTTP error {}: {}", status, body),
    }))
}

/// Pull the generated text out of a single-shot response body
fn generated_text(json: &Value) -> HarnessResult<String> {
    json["generated_text"]
        .as_str()
        .or_else(|| json["text"].as_str())
        .or_else(|| json["generations"][0]["text"].as_str())
        .map(str::to_string)
        .ok_or_else(|| HarnessError::backend(format!("Unexpected response format: {}", json)))
}

#[async_trait]
impl LanguageModel for XGenClient {
    async fn call(&self, prompt: &str) -> HarnessResult<String> {
        let body = json!({
            "prompt": prompt,
            "max_tokens": self.max_tokens,
            "stop_sequences": [END_OF_PROMPT_TAG],
        });

        debug!(endpoint = %self.endpoint, bytes = prompt.len(), "xgen single-shot request");
        let response = check_status(self.post("generate").json(&body).send().await?).await?;
        let json: Value = response.json().await?;
        generated_text(&json)
    }

    async fn chat_stream(&self, request: ChatRequest, operation: &str) -> HarnessResult<ChunkStream> {
        debug!(endpoint = %self.endpoint, operation, "xgen streaming request");
        let response = self
            .post("generate/stream")
            .header(OPERATION_HEADER, operation)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(decode_sse(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        "xgen"
    }
}

/// Decode one server-sent event line
///
/// Returns `None` for lines that carry no chunk (comments, `event:`,
/// blank separators).
pub fn parse_sse_line(line: &str) -> Option<StreamChunk> {
    let data = line.trim_end_matches('\r').strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(StreamChunk::Done {
            text: String::new(),
            reason: "stop".to_string(),
        });
    }
    Some(StreamChunk::from_json(data))
}

struct SseState<E> {
    body: BoxStream<'static, Result<Bytes, E>>,
    buffer: Vec<u8>,
    pending: VecDeque<HarnessResult<StreamChunk>>,
    finished: bool,
}

impl<E> SseState<E> {
    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&line[..line.len() - 1]);
        }
    }

    fn push_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        if let Some(chunk) = parse_sse_line(&line) {
            self.pending.push_back(Ok(chunk));
        }
    }
}

/// Turn an SSE byte stream into chunks
///
/// Lines are split on raw bytes so multi-byte characters straddling two
/// network reads decode intact. A transport error is yielded once and ends
/// the stream.
pub fn decode_sse<S, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<HarnessError> + Send + 'static,
{
    let state = SseState {
        body: body.boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_complete_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    if !rest.is_empty() {
                        state.push_line(&rest);
                    }
                }
            }
        }
    })
    .boxed()
}
