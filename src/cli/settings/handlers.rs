//! Handlers for each configuration key.

use crate::core::catalog::PERSONA_BACKEND_MODEL;
use crate::core::config::data::Config;

use super::error::SettingError;
use super::helpers::{format_bool, parse_bool, validate_endpoint, validate_model};
use super::SettingHandler;

pub struct EndpointHandler;

impl SettingHandler for EndpointHandler {
    fn key(&self) -> &'static str {
        "endpoint"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.first().ok_or(SettingError::MissingArgs {
            hint: "To set the inference endpoint, specify a URL:",
            example: "jarvis-chat set endpoint http://localhost:8080/api/jarvis",
        })?;
        let endpoint = validate_endpoint(input)?;
        config.endpoint = Some(endpoint.clone());
        Ok(format!("✅ Set endpoint to: {endpoint}"))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.endpoint = None;
        Ok(format!(
            "✅ Unset endpoint (will use default: {})",
            config.endpoint()
        ))
    }

    fn format(&self, config: &Config) -> String {
        match &config.endpoint {
            Some(endpoint) => format!("  endpoint: {endpoint}"),
            None => format!("  endpoint: (unset, default: {})", config.endpoint()),
        }
    }
}

pub struct DefaultModelHandler;

impl SettingHandler for DefaultModelHandler {
    fn key(&self) -> &'static str {
        "default-model"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.first().ok_or(SettingError::MissingArgs {
            hint: "To set a default model, specify its id:",
            example: "jarvis-chat set default-model mistralai/mistral-7b-instruct",
        })?;
        let model = validate_model(input)?;
        config.default_model = Some(model.clone());
        Ok(format!("✅ Set default-model to: {model}"))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.default_model = None;
        Ok("✅ Unset default-model".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match &config.default_model {
            Some(model) => format!("  default-model: {model}"),
            None => "  default-model: (unset)".to_string(),
        }
    }
}

pub struct StreamHandler;

impl SettingHandler for StreamHandler {
    fn key(&self) -> &'static str {
        "stream"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To choose streamed or whole replies, specify on or off:",
                example: "jarvis-chat set stream off",
            });
        }
        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        config.stream = Some(value);
        Ok(format!("✅ Set stream to: {}", format_bool(value)))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.stream = None;
        Ok("✅ Unset stream (will use default: on)".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match config.stream {
            Some(value) => format!("  stream: {}", format_bool(value)),
            None => "  stream: (unset, default: on)".to_string(),
        }
    }
}

pub struct PersonaBackendModelHandler;

impl SettingHandler for PersonaBackendModelHandler {
    fn key(&self) -> &'static str {
        "persona-backend-model"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let model = args.join(" ");
        if model.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To change the model behind the persona, specify a backend model id:",
                example: "jarvis-chat set persona-backend-model openai/gpt-4o-mini",
            });
        }
        let model = model.trim().to_string();
        config.persona_backend_model = Some(model.clone());
        Ok(format!("✅ Set persona-backend-model to: {model}"))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.persona_backend_model = None;
        Ok(format!(
            "✅ Unset persona-backend-model (will use default: {PERSONA_BACKEND_MODEL})"
        ))
    }

    fn format(&self, config: &Config) -> String {
        match &config.persona_backend_model {
            Some(model) => format!("  persona-backend-model: {model}"),
            None => format!("  persona-backend-model: (unset, default: {PERSONA_BACKEND_MODEL})"),
        }
    }
}

/// Data-driven handler for the `[speech]` command lists.
pub struct SpeechCommandHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    get: fn(&Config) -> Option<&Vec<String>>,
    set_field: fn(&mut Config, Option<Vec<String>>),
}

impl SettingHandler for SpeechCommandHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }
        (self.set_field)(config, Some(args.to_vec()));
        Ok(format!("✅ Set {} to: {}", self.key, args.join(" ")))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        (self.set_field)(config, None);
        Ok(format!("✅ Unset {}", self.key))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(argv) if !argv.is_empty() => format!("  {}: {}", self.key, argv.join(" ")),
            _ => format!("  {}: (unset)", self.key),
        }
    }
}

pub fn speech_synthesizer_handler() -> SpeechCommandHandler {
    SpeechCommandHandler {
        key: "speech-synthesizer",
        hint: "To choose a text-to-speech command, give the program and its arguments:",
        example: "jarvis-chat set speech-synthesizer espeak -v en-us",
        get: |c| c.speech.synthesizer.as_ref(),
        set_field: |c, v| c.speech.synthesizer = v,
    }
}

pub fn speech_recognizer_handler() -> SpeechCommandHandler {
    SpeechCommandHandler {
        key: "speech-recognizer",
        hint: "To enable voice input, give a command that prints the transcript:",
        example: "jarvis-chat set speech-recognizer listen --language {locale}",
        get: |c| c.speech.recognizer.as_ref(),
        set_field: |c, v| c.speech.recognizer = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn default_model_is_canonicalized() {
        let mut config = Config::default();
        DefaultModelHandler
            .set(&args(&["Jarvis-Custom"]), &mut config)
            .expect("known model");
        assert_eq!(config.default_model.as_deref(), Some("jarvis-custom"));

        let err = DefaultModelHandler
            .set(&args(&["gpt-5"]), &mut config)
            .expect_err("unknown model");
        assert!(matches!(err, SettingError::UnknownModel { .. }));
    }

    #[test]
    fn stream_accepts_on_off_words() {
        let mut config = Config::default();
        StreamHandler
            .set(&args(&["off"]), &mut config)
            .expect("off parses");
        assert_eq!(config.stream, Some(false));
        assert_eq!(StreamHandler.format(&config), "  stream: off");

        assert!(matches!(
            StreamHandler.set(&args(&["maybe"]), &mut config),
            Err(SettingError::InvalidBoolean(_))
        ));

        StreamHandler.unset(&mut config).expect("unset");
        assert_eq!(config.stream, None);
    }

    #[test]
    fn endpoint_must_be_http() {
        let mut config = Config::default();
        assert!(matches!(
            EndpointHandler.set(&args(&["localhost:8080"]), &mut config),
            Err(SettingError::InvalidUrl(_))
        ));
        EndpointHandler
            .set(&args(&["http://localhost:8080/api/jarvis"]), &mut config)
            .expect("valid url");
        assert_eq!(config.endpoint(), "http://localhost:8080/api/jarvis");
    }

    #[test]
    fn speech_commands_keep_every_word() {
        let mut config = Config::default();
        let handler = speech_recognizer_handler();
        handler
            .set(&args(&["listen", "--language", "{locale}"]), &mut config)
            .expect("set");
        assert_eq!(
            handler.format(&config),
            "  speech-recognizer: listen --language {locale}"
        );
        assert!(matches!(
            handler.set(&[], &mut config),
            Err(SettingError::MissingArgs { .. })
        ));
    }
}
