//! Speech adapters backed by external programs.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{SpeechRecognizer, SpeechSynthesizer, VoiceError};

const LOCALE_PLACEHOLDER: &str = "{locale}";

/// Default text-to-speech program for the current platform.
pub fn default_synthesizer_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["say".to_string()]
    } else {
        vec!["espeak".to_string()]
    }
}

/// Runs a command and reads the transcript from its stdout. Any `{locale}`
/// argument is replaced by the recognition locale.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// Build from a `[program, args...]` list. Returns `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn resolved_args(&self, locale: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(LOCALE_PLACEHOLDER, locale))
            .collect()
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn listen(&self, locale: &str) -> Result<String, VoiceError> {
        let output = Command::new(&self.program)
            .args(self.resolved_args(locale))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| VoiceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(VoiceError::Engine(if message.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                message.to_string()
            }));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(VoiceError::NoSpeech);
        }
        Ok(transcript)
    }
}

/// One running speech program. The watcher task reaps it when it exits on its
/// own, or kills and reaps it once `stop` fires.
#[derive(Debug)]
struct Playback {
    stop: CancellationToken,
    watcher: JoinHandle<()>,
}

/// Spawns a command with the text as its final argument; cancelling kills it.
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    playback: Option<Playback>,
}

impl CommandSynthesizer {
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            playback: None,
        })
    }

    #[cfg(test)]
    fn is_speaking(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|playback| !playback.watcher.is_finished())
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&mut self, text: &str) -> Result<(), VoiceError> {
        self.cancel();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VoiceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stop = CancellationToken::new();
        let token = stop.clone();
        let program = self.program.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => debug!(program = %program, %status, "speech finished"),
                    Err(err) => debug!(program = %program, error = %err, "speech wait failed"),
                },
                _ = token.cancelled() => {
                    if let Err(err) = child.kill().await {
                        debug!(program = %program, error = %err, "speech kill failed");
                    }
                }
            }
        });
        self.playback = Some(Playback { stop, watcher });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.stop.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert!(CommandRecognizer::from_argv(&[]).is_none());
        assert!(CommandSynthesizer::from_argv(&[]).is_none());
    }

    #[test]
    fn locale_placeholder_is_substituted() {
        let recognizer =
            CommandRecognizer::from_argv(&argv(&["stt", "--lang", "{locale}"])).expect("argv");
        assert_eq!(
            recognizer.resolved_args("en-US"),
            vec!["--lang".to_string(), "en-US".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognizer_reads_trimmed_stdout() {
        let recognizer =
            CommandRecognizer::from_argv(&argv(&["echo", "  hello {locale} "])).expect("argv");
        let transcript = recognizer.listen("en-US").await.expect("transcript");
        assert_eq!(transcript, "hello en-US");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognizer_maps_silence_and_failures() {
        let silent = CommandRecognizer::from_argv(&argv(&["true"])).expect("argv");
        assert!(matches!(
            silent.listen("en-US").await,
            Err(VoiceError::NoSpeech)
        ));

        let failing = CommandRecognizer::from_argv(&argv(&["false"])).expect("argv");
        assert!(matches!(
            failing.listen("en-US").await,
            Err(VoiceError::Engine(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn finished_speech_is_reaped_without_a_cancel() {
        let mut synthesizer = CommandSynthesizer::from_argv(&argv(&["true"])).expect("argv");
        synthesizer.speak("hello").expect("spawn");

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while synthesizer.is_speaking() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("speech program exits and is waited on");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_stops_long_speech() {
        let mut synthesizer = CommandSynthesizer::from_argv(&argv(&["sleep"])).expect("argv");
        synthesizer.speak("30").expect("spawn");
        assert!(synthesizer.is_speaking());

        synthesizer.cancel();
        assert!(!synthesizer.is_speaking());
        synthesizer.cancel();
    }

    #[tokio::test]
    async fn missing_programs_surface_spawn_errors() {
        let mut synthesizer =
            CommandSynthesizer::from_argv(&argv(&["definitely-not-a-real-tts-binary"]))
                .expect("argv");
        let err = synthesizer.speak("hello").expect_err("spawn fails");
        assert!(matches!(err, VoiceError::Spawn { .. }));
        synthesizer.cancel();
    }
}
