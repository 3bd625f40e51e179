//! Scripted Backend
//!
//! A model that replays canned output. Used by the test suite and for dry
//! runs of the pipeline without a live endpoint.

use super::{ChatRequest, ChunkStream, LanguageModel};
use crate::errors::{HarnessError, HarnessResult};
use crate::stream::StreamChunk;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A mock model returning fixed output.
///
/// Every prompt it receives is recorded, and streamed chunks are counted as
/// they are handed out, so callers can check how far a stream was read.
pub struct ScriptedModel {
    response: String,
    chunks: Vec<StreamChunk>,
    failure: Option<HarnessError>,
    prompts: Mutex<Vec<String>>,
    operations: Mutex<Vec<String>>,
    yielded: Arc<AtomicUsize>,
    name: &'static str,
}

impl ScriptedModel {
    fn build(response: String, chunks: Vec<StreamChunk>, failure: Option<HarnessError>) -> Self {
        Self {
            response,
            chunks,
            failure,
            prompts: Mutex::new(Vec::new()),
            operations: Mutex::new(Vec::new()),
            yielded: Arc::new(AtomicUsize::new(0)),
            name: "scripted",
        }
    }

    /// Answer single-shot calls with `response`.
    ///
    /// Streamed calls get the response as one finished chunk.
    pub fn with_response(response: impl Into<String>) -> Self {
        let response = response.into();
        let chunks = vec![StreamChunk::Done {
            text: response.clone(),
            reason: "stop".to_string(),
        }];
        Self::build(response, chunks, None)
    }

    /// Answer streamed calls with `chunks`.
    ///
    /// Single-shot calls get the concatenated chunk text.
    pub fn with_chunks(chunks: Vec<StreamChunk>) -> Self {
        let response = chunks
            .iter()
            .map(|chunk| match chunk {
                StreamChunk::Text(text) | StreamChunk::Done { text, .. } => text.as_str(),
                StreamChunk::Malformed => "",
            })
            .collect();
        Self::build(response, chunks, None)
    }

    /// Fail every call with `error`.
    pub fn failing(error: HarnessError) -> Self {
        Self::build(String::new(), Vec::new(), Some(error))
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Operation tags of streamed calls so far.
    pub fn operations(&self) -> Vec<String> {
        lock(&self.operations).clone()
    }

    /// Number of chunks handed to stream consumers.
    pub fn chunks_yielded(&self) -> usize {
        self.yielded.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> HarnessResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn call(&self, prompt: &str) -> HarnessResult<String> {
        lock(&self.prompts).push(prompt.to_string());
        self.check_failure()?;
        Ok(self.response.clone())
    }

    async fn chat_stream(&self, request: ChatRequest, operation: &str) -> HarnessResult<ChunkStream> {
        lock(&self.prompts).push(request.prompt);
        lock(&self.operations).push(operation.to_string());
        self.check_failure()?;

        let yielded = Arc::clone(&self.yielded);
        let chunks = self.chunks.clone().into_iter().map(Ok);
        Ok(stream::iter(chunks)
            .inspect(move |_| {
                yielded.fetch_add(1, Ordering::SeqCst);
            })
            .boxed())
    }

    fn name(&self) -> &str {
        self.name
    }
}
