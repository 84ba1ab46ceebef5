#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use futures_util::{stream, StreamExt};
#[cfg(test)]
use tokio::sync::{mpsc, Notify};

#[cfg(test)]
use crate::api::client::{InferenceBackend, RequestError, TextStream};
#[cfg(test)]
use crate::api::InferenceRequest;
#[cfg(test)]
use crate::core::app::App;
#[cfg(test)]
use crate::core::catalog::ModelCatalog;
#[cfg(test)]
use crate::core::chat_stream::{ChatStreamService, ResponseMode, StreamMessage};
#[cfg(test)]
use crate::core::conversation::ConversationState;
#[cfg(test)]
use crate::core::memory::InMemoryStore;
#[cfg(test)]
use crate::core::orchestrator::RequestOrchestrator;
#[cfg(test)]
use crate::voice::{SpeechRecognizer, SpeechSynthesizer, VoiceBridge, VoiceError, VoiceEvent};

#[cfg(test)]
#[derive(Debug, Clone)]
enum Script {
    Chunks(Vec<String>),
    Fail { status: u16, message: String },
}

/// Backend that replays a fixed reply and records every request it sees.
#[cfg(test)]
pub struct ScriptedBackend {
    script: Script,
    gate: Option<Arc<Notify>>,
    hang_after_chunks: bool,
    requests: Mutex<Vec<InferenceRequest>>,
}

#[cfg(test)]
impl ScriptedBackend {
    pub fn streaming<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Chunks(chunks.into_iter().map(Into::into).collect()))
    }

    pub fn whole(reply: &str) -> Self {
        Self::streaming([reply])
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self::with_script(Script::Fail {
            status,
            message: message.to_string(),
        })
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            gate: None,
            hang_after_chunks: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every response until [`ScriptedBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Keep the body open after the scripted chunks instead of ending it.
    pub fn hanging(mut self) -> Self {
        self.hang_after_chunks = true;
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn begin(&self, request: &InferenceRequest) -> Result<Vec<String>, RequestError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.script {
            Script::Chunks(chunks) => Ok(chunks.clone()),
            Script::Fail { status, message } => Err(RequestError::Status {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, RequestError> {
        Ok(self.begin(request).await?.concat())
    }

    async fn open_stream(&self, request: &InferenceRequest) -> Result<TextStream, RequestError> {
        let chunks = self.begin(request).await?;
        let body = stream::iter(chunks.into_iter().map(Ok::<String, RequestError>));
        if self.hang_after_chunks {
            Ok(Box::pin(body.chain(stream::pending())))
        } else {
            Ok(Box::pin(body))
        }
    }
}

#[cfg(test)]
pub struct ScriptedRecognizer {
    result: Result<String, String>,
    locales: Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedRecognizer {
    pub fn transcript(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            locales: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            locales: Mutex::new(Vec::new()),
        }
    }

    pub fn locales(&self) -> Vec<String> {
        self.locales.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn listen(&self, locale: &str) -> Result<String, VoiceError> {
        self.locales.lock().unwrap().push(locale.to_string());
        self.result.clone().map_err(VoiceError::Engine)
    }
}

/// Synthesizer fake; clones share what was spoken.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingSynthesizer {
    spoken: Arc<Mutex<Vec<String>>>,
    cancels: Arc<Mutex<usize>>,
}

#[cfg(test)]
impl RecordingSynthesizer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        *self.cancels.lock().unwrap()
    }
}

#[cfg(test)]
impl SpeechSynthesizer for RecordingSynthesizer {
    fn speak(&mut self, text: &str) -> Result<(), VoiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn cancel(&mut self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

#[cfg(test)]
pub struct TestHarness {
    pub app: App,
    pub stream_rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    pub voice_rx: mpsc::UnboundedReceiver<VoiceEvent>,
    pub backend: Arc<ScriptedBackend>,
    pub store: InMemoryStore,
    pub synthesizer: RecordingSynthesizer,
}

#[cfg(test)]
pub fn create_test_app(backend: ScriptedBackend, mode: ResponseMode) -> TestHarness {
    create_test_app_with_recognizer(backend, mode, None)
}

#[cfg(test)]
pub fn create_test_app_with_recognizer(
    backend: ScriptedBackend,
    mode: ResponseMode,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
) -> TestHarness {
    let backend = Arc::new(backend);
    let store = InMemoryStore::new();
    let synthesizer = RecordingSynthesizer::default();

    let state = ConversationState::new(ModelCatalog::builtin(), Box::new(store.clone()));
    let (service, stream_rx) = ChatStreamService::new();
    let orchestrator = RequestOrchestrator::new(backend.clone(), service, mode);
    let (voice, voice_rx) = VoiceBridge::new(recognizer, Some(Box::new(synthesizer.clone())));

    TestHarness {
        app: App::new(state, orchestrator, voice),
        stream_rx,
        voice_rx,
        backend,
        store,
        synthesizer,
    }
}

#[cfg(test)]
impl TestHarness {
    /// Apply the next stream message, if one shows up in time.
    pub async fn apply_next(&mut self) -> Option<(StreamMessage, u64)> {
        let received = tokio::time::timeout(Duration::from_secs(5), self.stream_rx.recv())
            .await
            .ok()
            .flatten()?;
        self.app
            .handle_stream_message(received.0.clone(), received.1);
        Some(received)
    }

    /// Apply stream messages until no request is pending.
    pub async fn settle(&mut self) {
        while self.app.orchestrator.has_pending() {
            if self.apply_next().await.is_none() {
                break;
            }
        }
    }
}
