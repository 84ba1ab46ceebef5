//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    speech_recognizer_handler, speech_synthesizer_handler, DefaultModelHandler,
    EndpointHandler, PersonaBackendModelHandler, StreamHandler,
};
use super::SettingHandler;

pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `jarvis-chat set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(EndpointHandler));
        registry.register(Box::new(DefaultModelHandler));
        registry.register(Box::new(StreamHandler));
        registry.register(Box::new(PersonaBackendModelHandler));
        registry.register(Box::new(speech_synthesizer_handler()));
        registry.register(Box::new(speech_recognizer_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
