//! Response Stream Consumer Tests

use futures::stream::{self, StreamExt};
use prompt_lab::{consume, consume_with_outcome, HarnessResult, StreamChunk, Termination};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn text(s: &str) -> HarnessResult<StreamChunk> {
    Ok(StreamChunk::Text(s.to_string()))
}

#[tokio::test]
async fn test_sentinel_stops_reading() {
    let polled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polled);
    let chunks = stream::iter(vec![
        text("one "),
        text("two "),
        text("three<|endofprompt|>"),
        text(" four"),
        text(" five"),
    ])
    .inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let outcome = consume_with_outcome(chunks).await;

    assert_eq!(outcome.text, "one two three");
    assert_eq!(outcome.chunks_read, 3);
    assert_eq!(outcome.termination, Termination::Sentinel);
    assert_eq!(polled.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_finish_reason_stops_reading() {
    let chunks = stream::iter(vec![
        text("openapi: "),
        Ok(StreamChunk::Done {
            text: "3.0.0".to_string(),
            reason: "length".to_string(),
        }),
        text("ignored"),
    ]);
    let outcome = consume_with_outcome(chunks).await;
    assert_eq!(outcome.text, "openapi: 3.0.0");
    assert_eq!(outcome.termination, Termination::Finished("length".to_string()));
}

#[tokio::test]
async fn test_malformed_chunk_stops_reading() {
    let chunks = stream::iter(vec![
        text("partial"),
        Ok(StreamChunk::from_json("{\"unexpected\": true}")),
        text("ignored"),
    ]);
    let outcome = consume_with_outcome(chunks).await;
    assert_eq!(outcome.text, "partial");
    assert_eq!(outcome.termination, Termination::Malformed);
}

#[tokio::test]
async fn test_sentinel_mid_chunk_keeps_tail() {
    let chunks = stream::iter(vec![text("a"), text("b<|endofprompt|>c")]);
    assert_eq!(consume(chunks).await, "abc");
}

#[tokio::test]
async fn test_decoded_wire_chunks() {
    let chunks = stream::iter(
        vec![
            r#"{"generated_text": "openapi: 3.0.0\n"}"#,
            r#"{"text": "info: {}", "finish_reason": "stop"}"#,
            r#"{"text": "never"}"#,
        ]
        .into_iter()
        .map(|payload| Ok(StreamChunk::from_json(payload))),
    );
    assert_eq!(consume(chunks).await, "openapi: 3.0.0\ninfo: {}");
}
