//! Request/response boundary between the transcript and the chat model.
//!
//! The session never mutates history and never fails: remote errors come
//! back as a localized message with no places attached.

use std::sync::Arc;

use tracing::error;

use crate::ai::{ChatBackend, ChatRequest};
use crate::language::Language;
use crate::state::{ChatMessage, ChatTurn, PlaceReference, UserFix};
use crate::strings::strings;

/// Display-ready answer for the pending turn
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub places: Vec<PlaceReference>,
}

pub fn system_instruction(language: Language) -> String {
    let code = language.code();
    format!(
        r#"
You are "Murshid", an expert, friendly, and enthusiastic AI tour guide.
Your goal is to help users plan trips, find restaurants, discover historical sites, and navigate cities.

**LANGUAGE INSTRUCTION:**
You MUST reply in the user's preferred language, which is code: "{code}".
If the user speaks a different language in the message, adapt to that, but default to {code}.

Guidelines:
1. Be helpful, concise, and culturally aware.
2. When suggesting places, you rely on the Google Maps tools provided to give accurate, real-world locations.
3. Use formatting (bolding, lists) to make itineraries easy to read.
4. If the user asks for "nearby" places, use the provided location context.

**RESTAURANT & CAFE LISTINGS:**
When the user asks for restaurants or cafes, you **MUST** provide a structured list.
For EACH recommendation, you **MUST** provide the following details if available (use Google Maps grounding to verify):
- **Name:** The name of the place.
- **Rating:** User rating (e.g., ⭐ 4.5).
- **Cuisine:** (e.g., Moroccan, Italian, Cafe).
- **Price:** (e.g., 💲 Moderate, 💲💲 High, 💲💲💲 Luxury).
- **Hours:** Opening/Closing times.
- **Description:** Brief description of the vibe or specialties.

**HOTEL & ACCOMMODATION LISTINGS:**
When the user asks for hotels or accommodation, you **MUST** provide a structured list containing specific details.
Use Google Maps grounding to find real places.
For EACH hotel, use this exact format:

1. **[Hotel Name]**
   - **Rating:** [Star Rating e.g., ⭐⭐⭐⭐⭐]
   - **Price:** [Price in Local Currency] /night (approx).
   - **Location:** [Neighborhood/Area] - (Mention proximity to landmarks).
   - **Key Features:** [List 3-4 key amenities, e.g., Pool, Free WiFi, Breakfast].

**CAR RENTAL (AGENCY) LISTINGS:**
When the user asks for car rentals, you **MUST** provide a structured list.
Use Google Maps grounding to find real agencies.
For EACH agency:
1. **[Agency Name]**
   - **Rating:** [User rating e.g., ⭐ 4.2]
   - **Location:** [Address/Area]
   - **Details:** [Car types if known, e.g., SUV, City Cars]
   - **Notes:** [Open hours or specific rental conditions if available]

Ensure the response is visually clean, using bullet points. If exact prices are not available via the tool, provide a realistic estimate based on the hotel/agency tier.
"#
    )
}

/// Prior turns as the model should see them: no placeholder, no greeting
pub fn history_for_model(history: &[ChatTurn]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|turn| !turn.pending && !turn.is_welcome())
        .map(ChatTurn::as_message)
        .collect()
}

pub fn build_request(
    text: &str,
    history: &[ChatTurn],
    user_fix: Option<UserFix>,
    language: Language,
) -> ChatRequest {
    ChatRequest {
        system_instruction: system_instruction(language),
        history: history_for_model(history),
        message: text.to_string(),
        location_bias: user_fix,
    }
}

#[derive(Clone)]
pub struct ConversationSession {
    backend: Arc<dyn ChatBackend>,
}

impl ConversationSession {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Ask the model for the next turn. `text` must already be non-blank;
    /// the caller owns the single-in-flight rule.
    pub async fn send(
        &self,
        text: &str,
        history: &[ChatTurn],
        user_fix: Option<UserFix>,
        language: Language,
    ) -> ChatReply {
        let request = build_request(text, history, user_fix, language);
        let strings = strings(language);

        match self.backend.generate(&request).await {
            Ok(response) => ChatReply {
                text: response
                    .text
                    .unwrap_or_else(|| strings.empty_reply.to_string()),
                places: response.places,
            },
            Err(e) => {
                error!("Chat request failed: {:#}", e);
                ChatReply {
                    text: strings.error.to_string(),
                    places: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ModelResponse;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<ChatRequest>>,
        reply: Option<ModelResponse>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn generate(&self, request: &ChatRequest) -> Result<ModelResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().ok_or_else(|| anyhow!("network down"))
        }
    }

    fn answered(text: &str) -> ChatTurn {
        let mut turn = ChatTurn::pending_assistant();
        turn.text = text.to_string();
        turn.pending = false;
        turn
    }

    fn transcript() -> Vec<ChatTurn> {
        vec![
            ChatTurn::welcome("Welcome!"),
            ChatTurn::user("Where is the medina?"),
            answered("In the old town."),
            ChatTurn::pending_assistant(),
        ]
    }

    #[test]
    fn test_history_skips_welcome_and_pending() {
        let history = history_for_model(&transcript());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Where is the medina?");
        assert_eq!(history[1].content, "In the old town.");
    }

    #[test]
    fn test_system_instruction_names_language() {
        let instruction = system_instruction(Language::French);
        assert!(instruction.contains("code: \"fr\""));
        assert!(instruction.contains("default to fr"));
    }

    #[tokio::test]
    async fn test_send_passes_location_bias_and_places() {
        let places = vec![PlaceReference::new("Bab Boujloud", "https://maps.example/1")];
        let backend = Arc::new(RecordingBackend {
            reply: Some(ModelResponse {
                text: Some("Visit Bab Boujloud.".to_string()),
                places: places.clone(),
            }),
            ..Default::default()
        });
        let session = ConversationSession::new(backend.clone());
        let fix = UserFix::new(34.06, -4.98);

        let reply = session
            .send("gates of Fes", &transcript(), Some(fix), Language::English)
            .await;

        assert_eq!(reply.text, "Visit Bab Boujloud.");
        assert_eq!(reply.places, places);
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].location_bias, Some(fix));
        assert_eq!(requests[0].message, "gates of Fes");
        assert_eq!(requests[0].history.len(), 2);
    }

    #[tokio::test]
    async fn test_send_without_fix_has_no_bias() {
        let backend = Arc::new(RecordingBackend {
            reply: Some(ModelResponse::default()),
            ..Default::default()
        });
        let session = ConversationSession::new(backend.clone());

        let reply = session.send("restaurants near me", &[], None, Language::English).await;

        assert_eq!(reply.text, strings(Language::English).empty_reply);
        assert!(reply.places.is_empty());
        assert_eq!(backend.requests.lock().unwrap()[0].location_bias, None);
    }

    #[tokio::test]
    async fn test_send_swallows_backend_errors() {
        let session = ConversationSession::new(Arc::new(RecordingBackend::default()));

        let reply = session.send("hello", &[], None, Language::Arabic).await;

        assert_eq!(reply.text, strings(Language::Arabic).error);
        assert!(reply.places.is_empty());
    }
}
