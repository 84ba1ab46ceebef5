//! Turns one user submission into one outbound call and applies its results.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::client::InferenceBackend;
use crate::api::InferenceRequest;
use crate::core::chat_stream::{ChatStreamService, ResponseMode, StreamMessage, StreamParams};
use crate::core::conversation::{ConversationState, ReplySlot};
use crate::voice::VoiceBridge;

/// Handle to one submitted request. Cancelling it aborts that request even
/// after a newer submission has become the active one.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
}

impl RequestHandle {
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Everything captured synchronously at submission time.
struct PendingTurn {
    question: String,
    model_id: String,
    model_label: String,
    epoch: u64,
    slot: Option<ReplySlot>,
    speak: bool,
    cancel_token: CancellationToken,
}

pub struct RequestOrchestrator {
    backend: Arc<dyn InferenceBackend>,
    service: ChatStreamService,
    mode: ResponseMode,
    active: Option<RequestHandle>,
    pending: HashMap<u64, PendingTurn>,
    next_stream_id: u64,
}

impl RequestOrchestrator {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        service: ChatStreamService,
        mode: ResponseMode,
    ) -> Self {
        Self {
            backend,
            service,
            mode,
            active: None,
            pending: HashMap::new(),
            next_stream_id: 0,
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn active(&self) -> Option<&RequestHandle> {
        self.active.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, stream_id: u64) -> bool {
        self.pending
            .get(&stream_id)
            .is_some_and(|turn| !turn.cancel_token.is_cancelled())
    }

    /// Submit `text`, or the current input buffer when `text` is `None`.
    /// Blank submissions issue nothing and return `None`.
    pub fn submit(
        &mut self,
        state: &mut ConversationState,
        text: Option<String>,
    ) -> Option<RequestHandle> {
        let text = text.unwrap_or_else(|| state.input().to_string());
        if text.trim().is_empty() {
            return None;
        }

        let model = state.selected_model().clone();
        state.append_user_message(&text, &model.display_name);
        state.clear_input();

        let memory_context = if model.is_persona() {
            state.memory().context()
        } else {
            String::new()
        };
        let backend_model = state.catalog().backend_model_for(&model.id);
        let request = match self.mode {
            ResponseMode::Whole => InferenceRequest {
                query: format!("{memory_context}\n{text}").trim().to_string(),
                model: backend_model,
                memory_context: None,
            },
            ResponseMode::Streamed => InferenceRequest {
                query: text.clone(),
                model: backend_model,
                memory_context: Some(memory_context),
            },
        };

        // The slot is captured before anything is spawned so that later
        // transcript changes cannot shift where this reply lands.
        let slot = self
            .mode
            .is_streamed()
            .then(|| state.append_placeholder_reply(&model.display_name));

        // The voice flag belongs to this submission only.
        let speak = state.speak_after_reply();
        state.set_speak_after_reply(false);

        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;
        let cancel_token = CancellationToken::new();
        let handle = RequestHandle {
            stream_id,
            cancel_token: cancel_token.clone(),
        };

        self.pending.insert(
            stream_id,
            PendingTurn {
                question: text,
                model_id: model.id.clone(),
                model_label: model.display_name.clone(),
                epoch: state.epoch(),
                slot,
                speak,
                cancel_token: cancel_token.clone(),
            },
        );
        self.active = Some(handle.clone());
        state.set_loading(true);

        info!(stream_id, model = %model.id, mode = ?self.mode, "submitting request");
        self.service.spawn_stream(StreamParams {
            backend: self.backend.clone(),
            request,
            mode: self.mode,
            cancel_token,
            stream_id,
        });

        Some(handle)
    }

    /// Abort the active request and any speech in progress.
    pub fn stop(&mut self, state: &mut ConversationState, voice: &mut VoiceBridge) {
        if let Some(active) = self.active.take() {
            active.cancel();
            self.pending.remove(&active.stream_id);
            debug!(stream_id = active.stream_id, "request stopped");
        }
        voice.cancel_speech();
        state.set_loading(false);
        state.set_speak_after_reply(false);
    }

    /// Apply one message from a request task to the conversation.
    pub fn handle_message(
        &mut self,
        state: &mut ConversationState,
        voice: &mut VoiceBridge,
        message: StreamMessage,
        stream_id: u64,
    ) {
        let Some((slot, cancelled)) = self
            .pending
            .get(&stream_id)
            .map(|turn| (turn.slot, turn.cancel_token.is_cancelled()))
        else {
            return;
        };

        // Anything still queued for an aborted request is dropped.
        let message = if cancelled {
            StreamMessage::Cancelled
        } else {
            message
        };

        match message {
            StreamMessage::Partial(text) => {
                if let Some(slot) = slot {
                    state.update_reply_content(slot, &text);
                }
            }
            StreamMessage::Completed(text) => {
                let Some(turn) = self.finish(state, stream_id) else {
                    return;
                };
                match turn.slot {
                    Some(slot) => {
                        state.update_reply_content(slot, &text);
                    }
                    None => {
                        state.append_reply(turn.epoch, &turn.model_label, &text);
                    }
                }
                state.record_memory_for(&turn.model_id, &turn.question, &text);
                if turn.speak {
                    voice.speak(&text);
                }
                debug!(stream_id, chars = text.len(), "reply completed");
            }
            StreamMessage::Failed(error) => {
                self.finish(state, stream_id);
                warn!(stream_id, error = %error, "inference request failed");
            }
            StreamMessage::Cancelled => {
                self.finish(state, stream_id);
                debug!(stream_id, "request cancelled");
            }
        }
    }

    fn finish(&mut self, state: &mut ConversationState, stream_id: u64) -> Option<PendingTurn> {
        let turn = self.pending.remove(&stream_id)?;
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.stream_id == stream_id)
        {
            self.active = None;
            state.set_loading(false);
        }
        Some(turn)
    }
}
