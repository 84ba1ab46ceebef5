//! Speech input and output.
//!
//! The bridge only coordinates: recognition and synthesis are ports
//! ([`SpeechRecognizer`], [`SpeechSynthesizer`]) so the chat loop works the
//! same with external commands, platform engines or test fakes.

pub mod command;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Recognition always runs in this locale.
pub const RECOGNITION_LOCALE: &str = "en-US";

#[derive(Debug)]
pub enum VoiceError {
    /// The engine could not be started.
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The engine ran but reported a failure.
    Engine(String),
    /// Recognition finished without any speech.
    NoSpeech,
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceError::Spawn { program, source } => {
                write!(f, "failed to start '{program}': {source}")
            }
            VoiceError::Engine(message) => write!(f, "speech engine error: {message}"),
            VoiceError::NoSpeech => write!(f, "no speech detected"),
        }
    }
}

impl StdError for VoiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            VoiceError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Run one recognition session and return the transcript.
    async fn listen(&self, locale: &str) -> Result<String, VoiceError>;
}

pub trait SpeechSynthesizer: Send {
    /// Start speaking `text`, replacing anything still being spoken.
    fn speak(&mut self, text: &str) -> Result<(), VoiceError>;

    /// Stop any speech in progress. Idempotent.
    fn cancel(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Transcript(String),
    RecognitionFailed(String),
}

pub struct VoiceBridge {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    tx: mpsc::UnboundedSender<VoiceEvent>,
    listening: bool,
}

impl VoiceBridge {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    ) -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                recognizer,
                synthesizer,
                tx,
                listening: false,
            },
            rx,
        )
    }

    /// A bridge with neither input nor output.
    pub fn disabled() -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        Self::new(None, None)
    }

    pub fn can_listen(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Start one recognition session. Returns `false` when no recognizer is
    /// configured or a session is already running.
    pub fn start_listening(&mut self) -> bool {
        let Some(recognizer) = self.recognizer.clone() else {
            warn!("speech recognition is not configured");
            return false;
        };
        if self.listening {
            return false;
        }
        self.listening = true;

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match recognizer.listen(RECOGNITION_LOCALE).await {
                Ok(transcript) => VoiceEvent::Transcript(transcript),
                Err(err) => VoiceEvent::RecognitionFailed(err.to_string()),
            };
            let _ = tx.send(event);
        });
        debug!(locale = RECOGNITION_LOCALE, "recognition started");
        true
    }

    /// Mark the running session as finished; called when its event arrives.
    pub fn finish_listening(&mut self) {
        self.listening = false;
    }

    pub fn speak(&mut self, text: &str) {
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return;
        };
        if let Err(err) = synthesizer.speak(text) {
            warn!(error = %err, "speech synthesis failed");
        }
    }

    pub fn cancel_speech(&mut self) {
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            synthesizer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{RecordingSynthesizer, ScriptedRecognizer};

    #[tokio::test]
    async fn listening_reports_the_transcript_once() {
        let recognizer = Arc::new(ScriptedRecognizer::transcript("what time is it"));
        let (mut bridge, mut rx) = VoiceBridge::new(Some(recognizer.clone()), None);

        assert!(bridge.start_listening());
        assert!(!bridge.start_listening(), "second session is refused");

        let event = rx.recv().await.expect("event");
        assert_eq!(event, VoiceEvent::Transcript("what time is it".into()));
        assert_eq!(recognizer.locales(), vec![RECOGNITION_LOCALE.to_string()]);

        bridge.finish_listening();
        assert!(!bridge.is_listening());
    }

    #[tokio::test]
    async fn recognition_errors_become_events() {
        let recognizer = Arc::new(ScriptedRecognizer::failing("microphone busy"));
        let (mut bridge, mut rx) = VoiceBridge::new(Some(recognizer), None);

        assert!(bridge.start_listening());
        let event = rx.recv().await.expect("event");
        assert_eq!(
            event,
            VoiceEvent::RecognitionFailed("speech engine error: microphone busy".into())
        );
    }

    #[test]
    fn without_recognizer_listening_is_refused() {
        let (mut bridge, _rx) = VoiceBridge::disabled();
        assert!(!bridge.can_listen());
        assert!(!bridge.start_listening());
        bridge.speak("ignored");
        bridge.cancel_speech();
    }

    #[test]
    fn speak_and_cancel_reach_the_synthesizer() {
        let synthesizer = RecordingSynthesizer::default();
        let (mut bridge, _rx) = VoiceBridge::new(None, Some(Box::new(synthesizer.clone())));
        bridge.speak("Hi there");
        bridge.cancel_speech();
        assert_eq!(synthesizer.spoken(), vec!["Hi there".to_string()]);
        assert_eq!(synthesizer.cancel_count(), 1);
    }
}
