pub mod gemini;

pub use gemini::GeminiClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::state::{ChatMessage, PlaceReference, UserFix};

/// Everything a chat model needs for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub history: Vec<ChatMessage>,
    pub message: String,
    /// Passed to the map search tool to prefer nearby results
    pub location_bias: Option<UserFix>,
}

/// Raw model output. `text` is `None` when the model returned no text parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub places: Vec<PlaceReference>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, request: &ChatRequest) -> Result<ModelResponse>;
}
