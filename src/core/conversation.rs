//! Conversation state: transcript, rolling memory, model selection and the
//! transient flags the UI reads.

use std::fmt;

use tracing::{debug, warn};

use crate::core::catalog::{ModelCatalog, ModelEntry};
use crate::core::memory::{MemoryEntry, MemoryStore, RollingMemory};
use crate::core::message::Message;

/// Position of a reply in the transcript, tagged with the conversation epoch
/// it was captured in. Writes through a slot from an earlier epoch are
/// dropped, so a reset can never be overwritten by an older stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplySlot {
    pub epoch: u64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModel(pub String);

impl fmt::Display for UnknownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model: {}", self.0)
    }
}

impl std::error::Error for UnknownModel {}

pub struct ConversationState {
    messages: Vec<Message>,
    epoch: u64,
    memory: RollingMemory,
    store: Box<dyn MemoryStore>,
    catalog: ModelCatalog,
    selected: usize,
    input: String,
    loading: bool,
    speak_after_reply: bool,
}

impl ConversationState {
    /// Build the state and load persisted memory. A store that fails to load
    /// is logged and treated as empty.
    pub fn new(catalog: ModelCatalog, store: Box<dyn MemoryStore>) -> Self {
        let entries = match store.load() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "starting with empty memory");
                Vec::new()
            }
        };

        Self {
            messages: Vec::new(),
            epoch: 0,
            memory: RollingMemory::from_entries(entries),
            store,
            catalog,
            selected: 0,
            input: String::new(),
            loading: false,
            speak_after_reply: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn memory(&self) -> &RollingMemory {
        &self.memory
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Append a user message. Blank text is ignored.
    pub fn append_user_message(&mut self, text: &str, model_label: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.messages.push(Message::user(text, model_label));
        true
    }

    /// Append an empty assistant message for a streamed reply to fill in.
    pub fn append_placeholder_reply(&mut self, model_label: &str) -> ReplySlot {
        self.messages.push(Message::assistant(String::new(), model_label));
        ReplySlot {
            epoch: self.epoch,
            index: self.messages.len() - 1,
        }
    }

    /// Append a finished reply, unless the conversation was reset since
    /// `epoch` was captured.
    pub fn append_reply(&mut self, epoch: u64, model_label: &str, text: &str) -> Option<ReplySlot> {
        if epoch != self.epoch {
            return None;
        }
        self.messages.push(Message::assistant(text, model_label));
        Some(ReplySlot {
            epoch,
            index: self.messages.len() - 1,
        })
    }

    /// Replace the content of the reply at `slot` with the full text so far.
    pub fn update_reply_content(&mut self, slot: ReplySlot, full_text: &str) -> bool {
        if slot.epoch != self.epoch {
            return false;
        }
        match self.messages.get_mut(slot.index) {
            Some(message) if message.is_assistant() => {
                if message.content != full_text {
                    message.content.clear();
                    message.content.push_str(full_text);
                }
                true
            }
            _ => false,
        }
    }

    /// Record a (question, answer) pair if the selected model is the persona.
    pub fn record_memory(&mut self, question: &str, answer: &str) -> bool {
        let model_id = self.selected_model().id.clone();
        self.record_memory_for(&model_id, question, answer)
    }

    /// Record a pair on behalf of the model a turn was submitted with.
    pub fn record_memory_for(&mut self, model_id: &str, question: &str, answer: &str) -> bool {
        let is_persona = self
            .catalog
            .find(model_id)
            .map(ModelEntry::is_persona)
            .unwrap_or(false);
        if !is_persona {
            return false;
        }
        self.memory.push(MemoryEntry::new(question, answer));
        self.persist_memory();
        true
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
        self.persist_memory();
    }

    /// Clear the transcript. Memory and model selection are kept.
    pub fn reset_conversation(&mut self) {
        self.messages.clear();
        self.epoch += 1;
        debug!(epoch = self.epoch, "conversation reset");
    }

    pub fn selected_model(&self) -> &ModelEntry {
        // The catalog is never empty and `selected` is only set from valid
        // positions.
        &self.catalog.entries()[self.selected]
    }

    pub fn select_model(&mut self, id: &str) -> Result<(), UnknownModel> {
        let index = self
            .catalog
            .position(id)
            .ok_or_else(|| UnknownModel(id.to_string()))?;
        self.selected = index;
        Ok(())
    }

    /// Move the selection to the next catalog entry, wrapping around.
    pub fn cycle_model(&mut self) -> &ModelEntry {
        self.selected = (self.selected + 1) % self.catalog.len();
        self.selected_model()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn speak_after_reply(&self) -> bool {
        self.speak_after_reply
    }

    pub fn set_speak_after_reply(&mut self, speak: bool) {
        self.speak_after_reply = speak;
    }

    fn persist_memory(&self) {
        if let Err(err) = self.store.save(&self.memory.to_vec()) {
            warn!(error = %err, "failed to persist memory");
        }
    }
}
