//! Model Backends
//!
//! The completion service is an external collaborator reached through the
//! [`LanguageModel`] trait, which offers the two call shapes the runner
//! needs:
//!
//! - [`LanguageModel::call`]: one assembled prompt in, one complete
//!   response out
//! - [`LanguageModel::chat_stream`]: a [`ChatRequest`] in, an ordered stream
//!   of [`StreamChunk`]s out
//!
//! [`connect`] turns a [`Config`] into a backend. Only XGen is implemented;
//! the OpenAI selector is recognized and rejected.

pub mod scripted;
pub mod xgen;

pub use scripted::ScriptedModel;
pub use xgen::XGenClient;

use crate::config::{Backend, Config};
use crate::errors::{HarnessError, HarnessResult};
use crate::stream::StreamChunk;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ordered chunks of a streamed completion
pub type ChunkStream = BoxStream<'static, HarnessResult<StreamChunk>>;

/// Streaming request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Fully assembled prompt
    pub prompt: String,
    /// Sequences that end generation
    pub stop_sequences: Vec<String>,
    /// Completion token budget
    pub max_tokens: u32,
    /// Provider-specific parameters
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ChatRequest {
    /// Create a request with the given prompt and stop sequence
    pub fn new(prompt: impl Into<String>, stop_sequence: &str, max_tokens: u32) -> Self {
        let mut parameters = serde_json::Map::new();
        parameters.insert(
            "command_source".to_string(),
            serde_json::Value::String("chat".to_string()),
        );
        Self {
            prompt: prompt.into(),
            stop_sequences: vec![stop_sequence.to_string()],
            max_tokens,
            parameters,
        }
    }
}

/// A text-completion service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a complete prompt and wait for the complete response
    async fn call(&self, prompt: &str) -> HarnessResult<String>;

    /// Start a streamed completion
    ///
    /// `operation` tags the request for the provider's bookkeeping.
    async fn chat_stream(&self, request: ChatRequest, operation: &str) -> HarnessResult<ChunkStream>;

    /// Backend name for logging
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Build the backend selected by `config`
pub fn connect(config: &Config) -> HarnessResult<Arc<dyn LanguageModel>> {
    match config.backend {
        Backend::XGen => Ok(Arc::new(XGenClient::new(config)?)),
        Backend::OpenAi => Err(HarnessError::backend_unavailable(config.backend.as_str())),
    }
}
