//! HTTP access to the inference endpoint.
//!
//! [`InferenceBackend`] is the seam the orchestrator talks to; [`HttpBackend`]
//! is the reqwest implementation used by the binary.

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};

use crate::api::{InferenceReply, InferenceRequest};

pub const DEFAULT_ENDPOINT: &str = "https://jarvis-backend-rbev.onrender.com/api/jarvis";

/// Decoded reply text, one item per network read.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, RequestError>> + Send>>;

/// Failures of a single inference call.
#[derive(Debug)]
pub enum RequestError {
    /// The request could not be sent or the body could not be read.
    Transport(reqwest::Error),

    /// The endpoint answered with a non-success status.
    Status {
        status: u16,
        /// Short summary of the error body.
        message: String,
    },

    /// The whole-shot body was not a `{ "reply": ... }` document.
    Decode(serde_json::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Transport(err) => write!(f, "request failed: {err}"),
            RequestError::Status { status, message } => {
                write!(f, "endpoint returned {status}: {message}")
            }
            RequestError::Decode(err) => write!(f, "malformed reply body: {err}"),
        }
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RequestError::Transport(err) => Some(err),
            RequestError::Status { .. } => None,
            RequestError::Decode(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        RequestError::Transport(err)
    }
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Issue the request and parse a single reply string.
    async fn complete(&self, request: &InferenceRequest) -> Result<String, RequestError>;

    /// Issue the request and hand back the body as decoded text chunks.
    async fn open_stream(&self, request: &InferenceRequest) -> Result<TextStream, RequestError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &InferenceRequest) -> Result<reqwest::Response, RequestError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(RequestError::Status {
                status,
                message: summarize_error_body(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, RequestError> {
        let body = self.post(request).await?.text().await?;
        let reply: InferenceReply = serde_json::from_str(&body).map_err(RequestError::Decode)?;
        Ok(reply.reply)
    }

    async fn open_stream(&self, request: &InferenceRequest) -> Result<TextStream, RequestError> {
        let response = self.post(request).await?;
        Ok(decode_text_stream(response.bytes_stream()))
    }
}

/// Turn a byte stream into a text stream without splitting UTF-8 sequences.
pub fn decode_text_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<RequestError> + Send + 'static,
{
    let state = (Box::pin(body), Utf8ChunkDecoder::default(), false);
    let decoded = stream::unfold(state, |(mut body, mut decoder, done)| async move {
        if done {
            return None;
        }
        loop {
            match body.next().await {
                Some(Ok(bytes)) => {
                    let text = decoder.decode(bytes.as_ref());
                    if !text.is_empty() {
                        return Some((Ok(text), (body, decoder, false)));
                    }
                }
                Some(Err(err)) => return Some((Err(err.into()), (body, decoder, true))),
                None => {
                    let tail = decoder.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    return Some((Ok(tail), (body, decoder, true)));
                }
            }
        }
    });
    Box::pin(decoded)
}

/// Incremental UTF-8 decoder that holds back an incomplete trailing sequence
/// until the next chunk arrives.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            let (valid_up_to, invalid) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(err) => (err.valid_up_to(), Some(err.error_len())),
            };
            out.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

            match invalid {
                None => {
                    self.pending.clear();
                    break;
                }
                // Truly invalid bytes: substitute and keep going.
                Some(Some(len)) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid_up_to + len);
                }
                // Incomplete sequence at the end: wait for more input.
                Some(None) => {
                    self.pending.drain(..valid_up_to);
                    break;
                }
            }
        }

        out
    }

    /// Flush whatever is left once the body ends.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("error").and_then(|v| v.as_str()))
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(summary) = summary {
            return summary.split_whitespace().collect::<Vec<_>>().join(" ");
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: Vec<Vec<u8>>) -> Vec<String> {
        let body = stream::iter(
            chunks
                .into_iter()
                .map(Ok::<Vec<u8>, RequestError>)
                .collect::<Vec<_>>(),
        );
        decode_text_stream(body)
            .map(|item| item.expect("chunk"))
            .collect()
            .await
    }

    #[test]
    fn decoder_holds_back_split_multibyte_sequences() {
        let text = "héllo → wörld";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = Utf8ChunkDecoder::default();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, text, "split at {split}");
        }
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        let out = decoder.decode(b"ok\xffok");
        assert_eq!(out, "ok\u{FFFD}ok");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn decoder_flushes_truncated_tail_lossily() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn text_stream_skips_chunks_that_only_carry_partial_characters() {
        let arrow = "→".as_bytes().to_vec();
        let chunks = vec![
            b"a".to_vec(),
            arrow[..1].to_vec(),
            arrow[1..2].to_vec(),
            arrow[2..].to_vec(),
            b"b".to_vec(),
        ];
        assert_eq!(collect(chunks).await, vec!["a", "→", "b"]);
    }

    #[test]
    fn error_summary_prefers_nested_message() {
        let body = r#"{"error":{"message":"model   overloaded","type":"server"}}"#;
        assert_eq!(summarize_error_body(body), "model overloaded");
        assert_eq!(summarize_error_body(r#"{"error":"nope"}"#), "nope");
        assert_eq!(summarize_error_body("  plain\ntext "), "plain text");
        assert_eq!(summarize_error_body(""), "<empty>");
    }

    #[test]
    fn status_error_display_includes_code() {
        let err = RequestError::Status {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "endpoint returned 503: busy");
    }
}
