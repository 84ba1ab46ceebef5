use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::client::{InferenceBackend, RequestError};
use crate::api::InferenceRequest;

/// How a reply is read from the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// One JSON document `{ "reply": ... }`.
    Whole,
    /// Raw text body consumed chunk by chunk.
    #[default]
    Streamed,
}

impl ResponseMode {
    pub fn from_stream_flag(stream: bool) -> Self {
        if stream {
            ResponseMode::Streamed
        } else {
            ResponseMode::Whole
        }
    }

    pub fn is_streamed(self) -> bool {
        self == ResponseMode::Streamed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// Full text accumulated so far (never a delta).
    Partial(String),
    Completed(String),
    Failed(String),
    Cancelled,
}

pub struct StreamParams {
    pub backend: Arc<dyn InferenceBackend>,
    pub request: InferenceRequest,
    pub mode: ResponseMode,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                backend,
                request,
                mode,
                cancel_token,
                stream_id,
            } = params;

            let outcome = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => StreamMessage::Cancelled,
                result = run_request(backend.as_ref(), &request, mode, &tx_clone, stream_id) => {
                    // An error surfacing after the token fired is the abort
                    // itself unwinding, not a failure.
                    match result {
                        _ if cancel_token.is_cancelled() => StreamMessage::Cancelled,
                        Ok(text) => StreamMessage::Completed(text),
                        Err(err) => StreamMessage::Failed(err.to_string()),
                    }
                }
            };

            debug!(stream_id, outcome = ?outcome_kind(&outcome), "request finished");
            let _ = tx_clone.send((outcome, stream_id));
        });
    }
}

async fn run_request(
    backend: &dyn InferenceBackend,
    request: &InferenceRequest,
    mode: ResponseMode,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> Result<String, RequestError> {
    match mode {
        ResponseMode::Whole => backend.complete(request).await,
        ResponseMode::Streamed => {
            let mut stream = backend.open_stream(request).await?;
            let mut accumulated = String::new();

            // Each read is awaited before the next starts, so partials arrive
            // in body order.
            while let Some(chunk) = stream.next().await {
                accumulated.push_str(&chunk?);
                let _ = tx.send((StreamMessage::Partial(accumulated.clone()), stream_id));
            }

            Ok(accumulated)
        }
    }
}

fn outcome_kind(message: &StreamMessage) -> &'static str {
    match message {
        StreamMessage::Partial(_) => "partial",
        StreamMessage::Completed(_) => "completed",
        StreamMessage::Failed(_) => "failed",
        StreamMessage::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::ScriptedBackend;

    fn request() -> InferenceRequest {
        InferenceRequest {
            query: "Hello".to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            memory_context: Some(String::new()),
        }
    }

    async fn collect_until_terminal(
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ) -> Vec<StreamMessage> {
        let mut seen = Vec::new();
        while let Some((message, _)) = rx.recv().await {
            let terminal = !matches!(message, StreamMessage::Partial(_));
            seen.push(message);
            if terminal {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn streamed_partials_are_accumulated_snapshots() {
        let (service, mut rx) = ChatStreamService::new();
        let backend = Arc::new(ScriptedBackend::streaming(["Hi", " ", "there"]));
        service.spawn_stream(StreamParams {
            backend,
            request: request(),
            mode: ResponseMode::Streamed,
            cancel_token: CancellationToken::new(),
            stream_id: 7,
        });

        let seen = collect_until_terminal(&mut rx).await;
        assert_eq!(
            seen,
            vec![
                StreamMessage::Partial("Hi".into()),
                StreamMessage::Partial("Hi ".into()),
                StreamMessage::Partial("Hi there".into()),
                StreamMessage::Completed("Hi there".into()),
            ]
        );
    }

    #[tokio::test]
    async fn whole_mode_sends_a_single_completion() {
        let (service, mut rx) = ChatStreamService::new();
        let backend = Arc::new(ScriptedBackend::whole("Hi there"));
        service.spawn_stream(StreamParams {
            backend: backend.clone(),
            request: request(),
            mode: ResponseMode::Whole,
            cancel_token: CancellationToken::new(),
            stream_id: 1,
        });

        let (message, id) = rx.recv().await.expect("message");
        assert_eq!(id, 1);
        assert_eq!(message, StreamMessage::Completed("Hi there".into()));
        assert_eq!(backend.requests(), vec![request()]);
    }

    #[tokio::test]
    async fn backend_failures_are_reported() {
        let (service, mut rx) = ChatStreamService::new();
        let backend = Arc::new(ScriptedBackend::failing(503, "busy"));
        service.spawn_stream(StreamParams {
            backend,
            request: request(),
            mode: ResponseMode::Streamed,
            cancel_token: CancellationToken::new(),
            stream_id: 2,
        });

        let (message, _) = rx.recv().await.expect("message");
        assert_eq!(
            message,
            StreamMessage::Failed("endpoint returned 503: busy".into())
        );
    }

    #[tokio::test]
    async fn cancellation_is_reported_as_cancelled_not_failed() {
        let (service, mut rx) = ChatStreamService::new();
        let backend = Arc::new(ScriptedBackend::whole("never").gated());
        let token = CancellationToken::new();
        service.spawn_stream(StreamParams {
            backend,
            request: request(),
            mode: ResponseMode::Whole,
            cancel_token: token.clone(),
            stream_id: 3,
        });

        token.cancel();
        let (message, id) = rx.recv().await.expect("message");
        assert_eq!(id, 3);
        assert_eq!(message, StreamMessage::Cancelled);
    }
}
