use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::client::DEFAULT_ENDPOINT;
use crate::core::catalog::ModelCatalog;
use crate::voice::command::default_synthesizer_command;

/// External speech programs, each given as `[program, args...]`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Text-to-speech command; the reply text is appended as the last argument.
    pub synthesizer: Option<Vec<String>>,
    /// Speech-to-text command printing the transcript on stdout.
    /// `{locale}` in any argument is replaced by the recognition locale.
    pub recognizer: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inference endpoint URL
    pub endpoint: Option<String>,
    /// Catalog id selected at startup
    pub default_model: Option<String>,
    /// Read replies as a text stream (default) or as one JSON document
    pub stream: Option<bool>,
    /// Backend model the persona is served by
    pub persona_backend_model: Option<String>,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Config {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Built-in catalog with the configured persona backend applied.
    pub fn catalog(&self) -> ModelCatalog {
        match &self.persona_backend_model {
            Some(model) if !model.trim().is_empty() => {
                ModelCatalog::builtin().with_persona_backend_model(model.trim())
            }
            _ => ModelCatalog::builtin(),
        }
    }

    pub fn stream_enabled(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn synthesizer_argv(&self) -> Vec<String> {
        match &self.speech.synthesizer {
            Some(argv) if !argv.is_empty() => argv.clone(),
            _ => default_synthesizer_command(),
        }
    }

    pub fn recognizer_argv(&self) -> Option<&[String]> {
        self.speech
            .recognizer
            .as_deref()
            .filter(|argv| !argv.is_empty())
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
