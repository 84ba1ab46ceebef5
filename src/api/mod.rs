use serde::{Deserialize, Serialize};

pub mod client;

/// Body posted to the inference endpoint.
///
/// Whole-shot requests carry only `query` and `model`; streamed requests
/// always carry `memoryContext` as well (empty for models without memory).
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct InferenceRequest {
    pub query: String,
    pub model: String,
    #[serde(rename = "memoryContext", skip_serializing_if = "Option::is_none")]
    pub memory_context: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct InferenceReply {
    pub reply: String,
}
