//! Fixed model catalog.
//!
//! The first entry is the persona model: it is the default selection, the only
//! model that accumulates rolling memory, and the only one whose id is
//! rewritten before it reaches the backend.

pub const PERSONA_MODEL_ID: &str = "jarvis-custom";

/// Concrete backend model the persona is served by unless configured otherwise.
pub const PERSONA_BACKEND_MODEL: &str = "openai/gpt-3.5-turbo";

const BUILTIN_MODELS: &[(&str, &str)] = &[
    (PERSONA_MODEL_ID, "Jarvis (Personal AI)"),
    ("mistralai/mistral-7b-instruct", "Mistral 7B Instruct"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: String,
    pub display_name: String,
}

impl ModelEntry {
    pub fn is_persona(&self) -> bool {
        self.id == PERSONA_MODEL_ID
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    persona_backend_model: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN_MODELS
            .iter()
            .map(|(id, display_name)| ModelEntry {
                id: (*id).to_string(),
                display_name: (*display_name).to_string(),
            })
            .collect();
        Self {
            entries,
            persona_backend_model: PERSONA_BACKEND_MODEL.to_string(),
        }
    }

    pub fn with_persona_backend_model(mut self, model: impl Into<String>) -> Self {
        self.persona_backend_model = model.into();
        self
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Position of a model by id (case-insensitive).
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.id.eq_ignore_ascii_case(id))
    }

    pub fn find(&self, id: &str) -> Option<&ModelEntry> {
        self.position(id).and_then(|index| self.entries.get(index))
    }

    /// Model identifier to put on the wire for a catalog id.
    pub fn backend_model_for(&self, id: &str) -> String {
        if id == PERSONA_MODEL_ID {
            self.persona_backend_model.clone()
        } else {
            id.to_string()
        }
    }
}
