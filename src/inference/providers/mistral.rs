//! Mistral provider implementation.
//!
//! Text only, like DeepSeek, but with a bounded retry policy: network-level
//! send failures are retried once after a fixed delay. Non-2xx responses are
//! terminal for the call and never retried. With the debug flag set, each
//! attempt emits a trace line (target, masked key, elapsed, status/body)
//! through the log facade without changing control flow.

use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::inference::provider::ProviderError;
use crate::inference::types::{Model, ProviderConfig, mask_api_key};

const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const MISTRAL_DEFAULT_MODEL: &str = "mistral-small-latest";
const MISTRAL_MAX_ATTEMPTS: u32 = 2;
const MISTRAL_RETRY_DELAY: Duration = Duration::from_secs(1);
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
}

// ============================================================================
// Response Parsing & Heuristics
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

/// Best-effort context window guess from the model id; Mistral's listing
/// endpoint does not report it.
fn context_window_for(model_id: &str) -> u32 {
    if model_id.contains("large") {
        128_000
    } else {
        // 8x7b/8x22b mixtures and ministral-8b all sit at 32K, as does the default.
        32_000
    }
}

fn map_model(entry: ModelEntry) -> Model {
    Model {
        description: format!("Mistral model: {}", entry.id),
        context_window: context_window_for(&entry.id),
        supports_vision: false,
        id: entry.id,
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct MistralProvider {
    config: ProviderConfig,
    base_url: String,
    client: reqwest::Client,
}

impl MistralProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| MISTRAL_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(MistralProvider {
            config,
            base_url,
            client,
        })
    }

    fn model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(MISTRAL_DEFAULT_MODEL)
    }

    /// Sends the chat request with the bounded retry loop.
    ///
    /// Only send-level failures retry; once a status line comes back the
    /// attempt is final, whatever the status.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            max_tokens: MAX_TOKENS,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 1;
        loop {
            let start = Instant::now();
            if self.config.debug {
                debug!(
                    "attempt {attempt}: POST {url} model={} api_key={}",
                    request.model,
                    mask_api_key(&self.config.api_key)
                );
            }

            let sent = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .header("Accept", "application/json")
                .json(&request)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    if self.config.debug {
                        debug!("attempt {attempt} failed after {:?}: {e}", start.elapsed());
                    }
                    if attempt < MISTRAL_MAX_ATTEMPTS {
                        attempt += 1;
                        tokio::time::sleep(MISTRAL_RETRY_DELAY).await;
                        continue;
                    }
                    return Err(ProviderError::Network(e.to_string()));
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;

            if self.config.debug {
                debug!(
                    "attempt {attempt}: status={} elapsed={:?} body={body}",
                    status.as_u16(),
                    start.elapsed()
                );
            }

            if !status.is_success() {
                warn!("Mistral API error: {} - {}", status.as_u16(), body);
                return Err(extract_api_error(status.as_u16(), &body));
            }

            return parse_chat_response(&body);
        }
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
                "Mistral model listing error: {} - {}",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_window_heuristic() {
        assert_eq!(context_window_for("mistral-large-latest"), 128_000);
        assert_eq!(context_window_for("mixtral-8x7b-instruct"), 32_000);
        assert_eq!(context_window_for("open-mixtral-8x22b"), 32_000);
        assert_eq!(context_window_for("ministral-8b-latest"), 32_000);
        assert_eq!(context_window_for("mistral-small-latest"), 32_000);
    }

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
        match extract_api_error(422, r#"{"message":"invalid model"}"#) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "invalid model");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_api_error_raw_body_fallback() {
        match extract_api_error(503, "upstream unavailable") {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_listing_maps_ids_to_descriptors() {
        let body = r#"{"data":[{"id":"mistral-large-latest"},{"id":"ministral-8b-latest"}]}"#;
        let response: ModelsResponse = serde_json::from_str(body).unwrap();
        let models: Vec<Model> = response.data.into_iter().map(map_model).collect();
        assert_eq!(models[0].context_window, 128_000);
        assert_eq!(models[0].description, "Mistral model: mistral-large-latest");
        assert_eq!(models[1].context_window, 32_000);
        assert!(models.iter().all(|m| !m.supports_vision));
    }
}
