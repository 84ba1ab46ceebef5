use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TranscriptRole {
    User,
    Assistant,
}

/// One transcript entry. `model_label` is the display name of the model that
/// was selected when the turn was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: TranscriptRole,
    pub content: String,
    pub model_label: String,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }
}

impl AsRef<str> for TranscriptRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for TranscriptRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TranscriptRole::User),
            "assistant" => Ok(TranscriptRole::Assistant),
            _ => Err(format!("invalid transcript role: {value}")),
        }
    }
}

impl TryFrom<String> for TranscriptRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TranscriptRole> for String {
    fn from(value: TranscriptRole) -> Self {
        value.as_str().to_string()
    }
}

impl Message {
    pub fn new(
        role: TranscriptRole,
        content: impl Into<String>,
        model_label: impl Into<String>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            model_label: model_label.into(),
        }
    }

    pub fn user(content: impl Into<String>, model_label: impl Into<String>) -> Self {
        Self::new(TranscriptRole::User, content, model_label)
    }

    pub fn assistant(content: impl Into<String>, model_label: impl Into<String>) -> Self {
        Self::new(TranscriptRole::Assistant, content, model_label)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    /// Speaker label shown in front of the message.
    pub fn speaker(&self) -> &str {
        match self.role {
            TranscriptRole::User => "You",
            TranscriptRole::Assistant => &self.model_label,
        }
    }
}
