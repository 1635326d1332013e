//! DeepSeek provider implementation.
//!
//! Text only; the dispatch layer rejects image inputs before this module is
//! reached. The request/response envelope mirrors the OpenAI chat-completion
//! shape, but the error body and the model listing are DeepSeek-specific.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::inference::provider::ProviderError;
use crate::inference::types::{Model, ProviderConfig};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
// deepseek-chat and deepseek-reasoner both run a 64K window.
const DEEPSEEK_DEFAULT_CONTEXT: u32 = 64_000;
const MAX_TOKENS: u32 = 1000;

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize, Debug, Clone)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize, Debug, Clone)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

/// Error body is flat: `{"message": "..."}`.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize, Debug)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    capabilities: Capabilities,
}

#[derive(Deserialize, Debug, Default)]
struct Capabilities {
    #[serde(default)]
    description: String,
    #[serde(default)]
    context_length: Option<u32>,
}

// ============================================================================
// Response Parsing
// ============================================================================

fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    match response.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content),
        None => Err(ProviderError::EmptyResult),
    }
}

fn extract_api_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => err.message,
        _ => body.to_string(),
    };
    ProviderError::Api { status, message }
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct DeepSeekProvider {
    config: ProviderConfig,
    base_url: String,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(DeepSeekProvider {
            config,
            base_url,
            client,
        })
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or(DEEPSEEK_DEFAULT_MODEL)
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        debug!("DeepSeek response status: {status}");

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!("DeepSeek API error: {} - {}", status.as_u16(), body);
            return Err(extract_api_error(status.as_u16(), &body));
        }

        parse_chat_response(&body)
    }

    pub async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(
                "DeepSeek model listing error: {} - {}",
                status.as_u16(),
                body
            );
            return Err(extract_api_error(status.as_u16(), &body));
        }

        let response: ModelsResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(response.data.into_iter().map(map_model).collect())
    }
}

/// Maps a listing entry to the common shape. Absent fields default rather
/// than fail; DeepSeek has no vision models.
fn map_model(entry: ModelEntry) -> Model {
    let description = if entry.capabilities.description.is_empty() {
        format!("DeepSeek model: {}", entry.id)
    } else {
        entry.capabilities.description
    };
    Model {
        id: entry.id,
        description,
        context_window: entry
            .capabilities
            .context_length
            .unwrap_or(DEEPSEEK_DEFAULT_CONTEXT),
        supports_vision: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response_returns_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "hello");
    }

    #[test]
    fn test_parse_chat_response_empty_choices() {
        let err = parse_chat_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult));
    }

    #[test]
    fn test_extract_api_error_flat_envelope() {
        match extract_api_error(402, r#"{"message":"insufficient balance"}"#) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "insufficient balance");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_map_model_uses_reported_capabilities() {
        let entry = ModelEntry {
            id: "deepseek-chat".to_string(),
            capabilities: Capabilities {
                description: "General purpose".to_string(),
                context_length: Some(64_000),
            },
        };
        let model = map_model(entry);
        assert_eq!(model.context_window, 64_000);
        assert_eq!(model.description, "General purpose");
        assert!(!model.supports_vision);
    }

    #[test]
    fn test_map_model_defaults_absent_fields() {
        let listing = r#"{"data":[{"id":"deepseek-reasoner"}]}"#;
        let response: ModelsResponse = serde_json::from_str(listing).unwrap();
        let model = map_model(response.data.into_iter().next().unwrap());
        assert_eq!(model.context_window, DEEPSEEK_DEFAULT_CONTEXT);
        assert_eq!(model.description, "DeepSeek model: deepseek-reasoner");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "deepseek-chat".to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 1000);
    }
}
