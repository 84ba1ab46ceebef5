use tracing::{debug, warn};

use crate::core::chat_stream::StreamMessage;
use crate::core::conversation::ConversationState;
use crate::core::orchestrator::{RequestHandle, RequestOrchestrator};
use crate::voice::{VoiceBridge, VoiceEvent};

pub mod session;

pub use session::{new_with_config, AppInitConfig, SessionBootstrap};

/// The chat client: conversation state, the request orchestrator and the
/// voice bridge, driven by key presses and by messages from spawned tasks.
pub struct App {
    pub state: ConversationState,
    pub orchestrator: RequestOrchestrator,
    pub voice: VoiceBridge,
    notice: Option<String>,
}

impl App {
    pub fn new(
        state: ConversationState,
        orchestrator: RequestOrchestrator,
        voice: VoiceBridge,
    ) -> Self {
        Self {
            state,
            orchestrator,
            voice,
            notice: None,
        }
    }

    /// Last failure worth showing in the status line. Never part of the transcript.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn submit(&mut self, text: Option<String>) -> Option<RequestHandle> {
        let handle = self.orchestrator.submit(&mut self.state, text)?;
        self.notice = None;
        Some(handle)
    }

    pub fn stop(&mut self) {
        self.orchestrator.stop(&mut self.state, &mut self.voice);
    }

    pub fn start_listening(&mut self) -> bool {
        if !self.voice.can_listen() {
            self.notice = Some("Speech recognition is not configured".to_string());
            return false;
        }
        self.voice.start_listening()
    }

    /// Clear the transcript. Requests still in flight cannot write into the
    /// new conversation; rolling memory is kept.
    pub fn new_chat(&mut self) {
        self.state.reset_conversation();
        self.notice = None;
        debug!(epoch = self.state.epoch(), "new conversation");
    }

    pub fn cycle_model(&mut self) -> &str {
        &self.state.cycle_model().display_name
    }

    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        if let StreamMessage::Failed(error) = &message {
            if self.orchestrator.is_pending(stream_id) {
                self.notice = Some(format!("Request failed: {error}"));
            }
        }
        self.orchestrator
            .handle_message(&mut self.state, &mut self.voice, message, stream_id);
    }

    pub fn handle_voice_event(&mut self, event: VoiceEvent) {
        self.voice.finish_listening();
        match event {
            VoiceEvent::Transcript(transcript) => {
                self.state.set_speak_after_reply(true);
                if self.submit(Some(transcript)).is_none() {
                    self.state.set_speak_after_reply(false);
                }
            }
            VoiceEvent::RecognitionFailed(error) => {
                warn!(error = %error, "speech recognition failed");
                self.notice = Some(format!("Voice input failed: {error}"));
            }
        }
    }
}
