use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::App;
use crate::api::client::HttpBackend;
use crate::core::chat_stream::{ChatStreamService, ResponseMode, StreamMessage};
use crate::core::config::data::Config;
use crate::core::config::io::memory_path;
use crate::core::conversation::ConversationState;
use crate::core::memory::{InMemoryStore, JsonFileStore, MemoryStore};
use crate::core::orchestrator::RequestOrchestrator;
use crate::voice::command::{CommandRecognizer, CommandSynthesizer};
use crate::voice::{SpeechRecognizer, SpeechSynthesizer, VoiceBridge, VoiceEvent};

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct AppInitConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub stream: Option<bool>,
    /// Start the voice bridge with the configured speech commands.
    pub voice: bool,
}

pub struct SessionBootstrap {
    pub app: App,
    pub stream_rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    pub voice_rx: mpsc::UnboundedReceiver<VoiceEvent>,
}

pub fn new_with_config(
    init_config: AppInitConfig,
    config: &Config,
) -> Result<SessionBootstrap, Box<dyn Error>> {
    let mut state = ConversationState::new(config.catalog(), open_memory_store());
    if let Some(model) = &init_config.model {
        state.select_model(model)?;
    } else if let Some(model) = &config.default_model {
        if let Err(err) = state.select_model(model) {
            warn!(error = %err, "ignoring configured default model");
        }
    }

    let endpoint = init_config
        .endpoint
        .clone()
        .unwrap_or_else(|| config.endpoint().to_string());
    let client = reqwest::Client::builder().build()?;
    let backend = Arc::new(HttpBackend::new(client, endpoint.clone()));

    let mode = ResponseMode::from_stream_flag(
        init_config
            .stream
            .unwrap_or_else(|| config.stream_enabled()),
    );
    let (service, stream_rx) = ChatStreamService::new();
    let orchestrator = RequestOrchestrator::new(backend, service, mode);

    let (voice, voice_rx) = if init_config.voice {
        let recognizer = config
            .recognizer_argv()
            .and_then(CommandRecognizer::from_argv)
            .map(|recognizer| Arc::new(recognizer) as Arc<dyn SpeechRecognizer>);
        let synthesizer = CommandSynthesizer::from_argv(&config.synthesizer_argv())
            .map(|synthesizer| Box::new(synthesizer) as Box<dyn SpeechSynthesizer>);
        VoiceBridge::new(recognizer, synthesizer)
    } else {
        VoiceBridge::disabled()
    };

    info!(
        endpoint = %endpoint,
        model = %state.selected_model().id,
        mode = ?mode,
        voice_input = voice.can_listen(),
        "session ready"
    );

    Ok(SessionBootstrap {
        app: App::new(state, orchestrator, voice),
        stream_rx,
        voice_rx,
    })
}

fn open_memory_store() -> Box<dyn MemoryStore> {
    match memory_path() {
        Ok(path) => Box::new(JsonFileStore::new(path)),
        Err(err) => {
            warn!(error = %err, "memory will not be persisted");
            Box::new(InMemoryStore::new())
        }
    }
}
