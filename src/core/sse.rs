//! Pull-based decoder for the upstream's `text/event-stream` responses.
//!
//! The decoder frames the raw byte stream into logical lines, keeps only
//! lines carrying a `data:` payload, and parses each payload as JSON. A
//! payload that fails to parse is logged and skipped; only the underlying
//! transport closing, erroring, or being cancelled ends the sequence.
//! Consumption is strictly forward-only: fragments are delivered at most
//! once and an exhausted stream stays exhausted.

use std::fmt;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Boxed byte-chunk stream as produced by an HTTP response body.
pub type HttpChunkStream =
    Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Answer-fragment stream over an HTTP response body.
pub type HttpAnswerStream = AnswerStream<HttpChunkStream>;

/// Decodes an event stream into discrete JSON objects, one `next_event` call
/// at a time. Never buffers more than the bytes needed to complete the
/// current line.
pub struct SseDecoder<S> {
    stream: Option<S>,
    buffer: Vec<u8>,
    cancel: CancellationToken,
}

impl<S, B, E> SseDecoder<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    pub fn new(stream: S) -> Self {
        Self::with_cancel_token(stream, CancellationToken::new())
    }

    /// Bind the decoder to an existing cancellation token. Cancelling the
    /// token makes the next poll drop the transport and end the sequence.
    pub fn with_cancel_token(stream: S, cancel: CancellationToken) -> Self {
        SseDecoder {
            stream: Some(stream),
            buffer: Vec::new(),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next decoded JSON event, or `None` once the stream is over.
    pub async fn next_event(&mut self) -> Option<Value> {
        loop {
            while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
                let event = decode_line(&self.buffer[..newline_pos]);
                self.buffer.drain(..=newline_pos);
                if event.is_some() {
                    return event;
                }
            }

            if self.cancel.is_cancelled() {
                self.terminate();
                return None;
            }

            let pulled = {
                let stream = self.stream.as_mut()?;
                tokio::select! {
                    chunk = stream.next() => Some(chunk),
                    _ = self.cancel.cancelled() => None,
                }
            };

            match pulled {
                // Cancelled: drop the transport so the connection closes.
                None => {
                    self.terminate();
                    return None;
                }
                Some(Some(Ok(chunk))) => {
                    self.buffer.extend_from_slice(chunk.as_ref());
                }
                Some(Some(Err(err))) => {
                    warn!(error = %err, "event stream transport error, ending stream");
                    self.terminate();
                    return None;
                }
                // Transport exhausted: a final line may lack its newline.
                Some(None) => {
                    let trailing = std::mem::take(&mut self.buffer);
                    self.stream = None;
                    return decode_line(&trailing);
                }
            }
        }
    }

    fn terminate(&mut self) {
        self.stream = None;
        self.buffer.clear();
    }
}

/// Decode one logical line. Lines without a `data:` prefix are skipped
/// silently; a `data:` payload that is not valid JSON is logged and skipped.
fn decode_line(line: &[u8]) -> Option<Value> {
    let line = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(err) => {
            warn!(error = %err, "invalid UTF-8 in event stream line, skipping");
            return None;
        }
    };

    let payload = line.strip_prefix("data:").map(str::trim_start)?;
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, payload, "undecodable stream event, skipping");
            None
        }
    }
}

/// Lazy sequence of `answer` text fragments extracted from decoded events.
///
/// Events without an `answer` field contribute nothing. The last
/// `conversation_id` seen in any event is recorded so callers can recover
/// the upstream-assigned conversation from a streaming chat turn.
pub struct AnswerStream<S> {
    decoder: SseDecoder<S>,
    conversation_id: Option<String>,
}

impl<S, B, E> AnswerStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    pub fn new(decoder: SseDecoder<S>) -> Self {
        AnswerStream {
            decoder,
            conversation_id: None,
        }
    }

    /// Next answer fragment, or `None` once the upstream stream is over.
    pub async fn next(&mut self) -> Option<String> {
        while let Some(event) = self.decoder.next_event().await {
            if let Some(id) = event.get("conversation_id").and_then(Value::as_str) {
                if !id.is_empty() {
                    self.conversation_id = Some(id.to_string());
                }
            }
            if let Some(answer) = event.get("answer").and_then(Value::as_str) {
                return Some(answer.to_string());
            }
        }
        None
    }

    /// Drain the remaining fragments into one string.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment);
        }
        text
    }

    /// Upstream-assigned conversation id, once one has streamed past.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.decoder.cancel_token()
    }
}
