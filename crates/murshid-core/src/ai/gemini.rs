use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use tracing::debug;

use super::{ChatBackend, ChatRequest, ModelResponse};
use crate::state::{ChatRole, PlaceReference};

// Travel answers mention bars, wineries and religious sites; the default
// filters block too many of them.
const RELAXED_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Serialize, Deserialize, Debug, Clone)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_maps: serde_json::Value,
}

#[derive(Serialize, Debug)]
struct GeminiLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRetrievalConfig {
    lat_lng: GeminiLatLng,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    retrieval_config: GeminiRetrievalConfig,
}

#[derive(Serialize, Debug)]
struct GeminiSafetySetting {
    category: String,
    threshold: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiSystemInstruction,
    contents: Vec<GeminiContent>,
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Deserialize, Debug, Default)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize, Debug)]
struct GeminiReviewSnippet {
    #[serde(alias = "review")]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPlaceAnswerSources {
    #[serde(default)]
    review_snippets: Vec<GeminiReviewSnippet>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiMapsChunk {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
    place_answer_sources: Option<GeminiPlaceAnswerSources>,
}

#[derive(Deserialize, Debug)]
struct GeminiGroundingChunk {
    maps: Option<GeminiMapsChunk>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiResponseContent,
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn into_model_response(self) -> ModelResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return ModelResponse::default();
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        let places = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.maps)
            .map(|maps| PlaceReference {
                review_snippet: maps
                    .place_answer_sources
                    .and_then(|s| s.review_snippets.into_iter().next())
                    .and_then(|s| s.content),
                title: maps.title,
                uri: maps.uri,
            })
            .collect();

        ModelResponse {
            text: if text.is_empty() { None } else { Some(text) },
            places,
        }
    }
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn text_content(role: &str, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.to_string(),
        parts: vec![GeminiPart {
            text: Some(text.to_string()),
        }],
    }
}

fn build_request(request: &ChatRequest) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = request
        .history
        .iter()
        .map(|m| text_content(wire_role(m.role), &m.content))
        .collect();
    contents.push(text_content("user", &request.message));

    GeminiRequest {
        system_instruction: GeminiSystemInstruction {
            parts: vec![GeminiPart {
                text: Some(request.system_instruction.clone()),
            }],
        },
        contents,
        tools: vec![GeminiTool {
            google_maps: serde_json::json!({}),
        }],
        tool_config: request.location_bias.map(|fix| GeminiToolConfig {
            retrieval_config: GeminiRetrievalConfig {
                lat_lng: GeminiLatLng {
                    latitude: fix.latitude,
                    longitude: fix.longitude,
                },
            },
        }),
        safety_settings: RELAXED_CATEGORIES
            .iter()
            .map(|category| GeminiSafetySetting {
                category: category.to_string(),
                threshold: "BLOCK_NONE".to_string(),
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.0-flash".to_string(),
        ]
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, request: &ChatRequest) -> Result<ModelResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(
            "Sending chat turn to {} ({} history messages, location bias: {})",
            self.model,
            request.history.len(),
            request.location_bias.is_some()
        );

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&build_request(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(gemini_response.into_model_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatMessage, UserFix};
    use httpmock::prelude::*;
    use serde_json::json;

    fn request(location_bias: Option<UserFix>) -> ChatRequest {
        ChatRequest {
            system_instruction: "be a guide".to_string(),
            history: vec![
                ChatMessage { role: ChatRole::User, content: "hi".to_string() },
                ChatMessage { role: ChatRole::Assistant, content: "hello".to_string() },
            ],
            message: "cafes in Fes".to_string(),
            location_bias,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request(&request(Some(UserFix::new(34.03, -5.0))))).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be a guide");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "cafes in Fes");
        assert_eq!(body["tools"][0]["googleMaps"], json!({}));
        assert_eq!(body["toolConfig"]["retrievalConfig"]["latLng"]["latitude"], 34.03);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_request_without_location_has_no_tool_config() {
        let body = serde_json::to_value(build_request(&request(None))).unwrap();
        assert!(body.get("toolConfig").is_none());
    }

    #[test]
    fn test_response_extracts_text_and_map_chunks() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Try "}, {"text": "these."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"maps": {
                            "uri": "https://maps.google.com/?cid=1",
                            "title": "Café Clock",
                            "placeAnswerSources": {"reviewSnippets": [{"review": "Camel burger!"}]}
                        }},
                        {"web": {"uri": "https://example.com", "title": "Blog"}},
                        {"maps": {"uri": "https://maps.google.com/?cid=2", "title": "Nejjarine"}}
                    ]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = response.into_model_response();

        assert_eq!(parsed.text.as_deref(), Some("Try these."));
        assert_eq!(parsed.places.len(), 2);
        assert_eq!(parsed.places[0].title, "Café Clock");
        assert_eq!(parsed.places[0].review_snippet.as_deref(), Some("Camel burger!"));
        assert_eq!(parsed.places[1].review_snippet, None);
    }

    #[test]
    fn test_empty_candidates() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.into_model_response(), ModelResponse::default());
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-flash:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200).json_body(json!({
                    "candidates": [{"content": {"parts": [{"text": "Marhaba!"}]}}]
                }));
            })
            .await;

        let client = GeminiClient::new("test-key", "gemini-2.5-flash", &server.base_url());
        let response = client.generate(&request(None)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.text.as_deref(), Some("Marhaba!"));
        assert!(response.places.is_empty());
    }

    #[tokio::test]
    async fn test_generate_reports_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("quota exhausted");
            })
            .await;

        let client = GeminiClient::new("test-key", "gemini-2.5-flash", &server.base_url());
        let err = client.generate(&request(None)).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exhausted"));
    }
}
