//! Response Stream Consumer
//!
//! Folds a streamed completion into text. Each chunk is classified as
//! `(done, fragment)`; the fragment is appended and the fold stops at the
//! first chunk that is done. Chunks after that are never polled.
//!
//! A chunk is done when its text carries the end-of-prompt sentinel, when
//! it reports a non-empty finish reason, or when it could not be decoded.
//! Stream errors count as undecodable chunks: the consumer prefers a
//! truncated result over failing the run.

use crate::assembly::END_OF_PROMPT_TAG;
use crate::errors::HarnessResult;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// One incremental unit of a streamed completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Generated text with no finish signal
    Text(String),
    /// Final chunk, possibly carrying trailing text
    Done {
        /// Trailing generated text (may be empty)
        text: String,
        /// Finish reason reported by the backend
        reason: String,
    },
    /// Chunk that did not have the expected shape
    Malformed,
}

/// Wire form of a chunk as emitted by the generation endpoint
#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default, alias = "generated_text", alias = "generatedText")]
    text: Option<String>,
    #[serde(default, alias = "finishReason")]
    finish_reason: Option<String>,
}

impl StreamChunk {
    /// Decode a JSON chunk payload
    ///
    /// Payloads with neither text nor a finish reason, and payloads that
    /// are not JSON objects, decode to [`StreamChunk::Malformed`].
    pub fn from_json(payload: &str) -> Self {
        let wire: WireChunk = match serde_json::from_str(payload) {
            Ok(wire) => wire,
            Err(_) => return StreamChunk::Malformed,
        };

        match (wire.text, wire.finish_reason) {
            (text, Some(reason)) if !reason.is_empty() => StreamChunk::Done {
                text: text.unwrap_or_default(),
                reason,
            },
            (Some(text), _) => StreamChunk::Text(text),
            (None, _) => StreamChunk::Malformed,
        }
    }

    /// Classify the chunk as `(done, fragment)`
    ///
    /// The fragment has the first end-of-prompt sentinel removed.
    pub fn inspect(&self) -> (bool, String) {
        match self {
            StreamChunk::Text(text) => {
                (text.contains(END_OF_PROMPT_TAG), strip_sentinel(text))
            }
            StreamChunk::Done { text, reason } => {
                let done = !reason.is_empty() || text.contains(END_OF_PROMPT_TAG);
                (done, strip_sentinel(text))
            }
            StreamChunk::Malformed => (true, String::new()),
        }
    }
}

fn strip_sentinel(text: &str) -> String {
    text.replacen(END_OF_PROMPT_TAG, "", 1)
}

/// Why the consumer stopped reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A chunk contained the end-of-prompt sentinel
    Sentinel,
    /// A chunk carried a finish reason
    Finished(String),
    /// A chunk was malformed or the stream yielded an error
    Malformed,
    /// The stream ended without a terminal chunk
    Exhausted,
}

/// Accumulated text plus how the stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Concatenated fragments
    pub text: String,
    /// Number of stream items read
    pub chunks_read: usize,
    /// Reason the fold stopped
    pub termination: Termination,
}

fn termination_of(chunk: &StreamChunk) -> Termination {
    match chunk {
        StreamChunk::Malformed => Termination::Malformed,
        StreamChunk::Done { reason, .. } if !reason.is_empty() => Termination::Finished(reason.clone()),
        StreamChunk::Text(_) | StreamChunk::Done { .. } => Termination::Sentinel,
    }
}

/// Consume a chunk stream, returning the text and termination details
pub async fn consume_with_outcome<S>(stream: S) -> StreamOutcome
where
    S: Stream<Item = HarnessResult<StreamChunk>>,
{
    futures::pin_mut!(stream);

    let mut text = String::new();
    let mut chunks_read = 0;

    while let Some(item) = stream.next().await {
        chunks_read += 1;

        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(chunk = chunks_read, error = %err, "stream error, treating as end of response");
                return StreamOutcome {
                    text,
                    chunks_read,
                    termination: Termination::Malformed,
                };
            }
        };

        let (done, fragment) = chunk.inspect();
        text.push_str(&fragment);

        if done {
            let termination = termination_of(&chunk);
            debug!(chunks = chunks_read, ?termination, "stream terminated");
            return StreamOutcome {
                text,
                chunks_read,
                termination,
            };
        }
    }

    debug!(chunks = chunks_read, "stream exhausted without terminal chunk");
    StreamOutcome {
        text,
        chunks_read,
        termination: Termination::Exhausted,
    }
}

/// Consume a chunk stream into accumulated text
pub async fn consume<S>(stream: S) -> String
where
    S: Stream<Item = HarnessResult<StreamChunk>>,
{
    consume_with_outcome(stream).await.text
}
