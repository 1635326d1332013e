//! OpenAI provider implementation using the Chat Completions API.
//!
//! Text prompts go out as a single user message with string content. When
//! images are attached the content becomes a block array (one text block,
//! one image_url block per attachment) and the request is pinned to the
//! vision model regardless of any configured text-model override.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::inference::provider::ProviderError;
use crate::inference::types::{Inputs, Model, ProviderConfig};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_TEXT_MODEL: &str = "gpt-4";
// Models accepting image input: o1, gpt-4.5-preview, gpt-4o, gpt-4o-mini, gpt-4-turbo
const OPENAI_VISION_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 1000;

// ============================================================================
// Chat Completions API Types
// ============================================================================

/// Message content: a bare string for text prompts, a block array for vision.
#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, Clone)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize, Debug, Clone)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
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

/// Error envelope: `{"error": {"message": "..."}}`.
#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
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
    owned_by: String,
}

// ============================================================================
// Response Parsing & Heuristics
// ============================================================================

/// Extracts the first choice's content from a 2xx chat-completion body.
fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    match response.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content),
        None => Err(ProviderError::EmptyResult),
    }
}

/// Maps a non-2xx body to an API error, preferring the structured envelope.
fn extract_api_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.to_string(),
    };
    ProviderError::Api { status, message }
}

/// Mime type from the attachment's file extension. Defaults to jpeg.
fn mime_from_filename(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "png",
        Some("jpg") | Some("jpeg") => "jpeg",
        Some("gif") => "gif",
        _ => "jpeg",
    }
}

/// Best-effort context window guess from the model id. The listing endpoint
/// does not report capabilities, so substring matching stands in until an
/// authoritative lookup exists.
fn context_window_for(model_id: &str) -> u32 {
    if model_id.contains("128k") {
        128_000
    } else if model_id.contains("32k") {
        32_000
    } else if model_id.contains("16k") {
        16_000
    } else {
        4096
    }
}

/// Best-effort vision guess from the model id. Same caveat as
/// [`context_window_for`].
fn is_vision_model(model_id: &str) -> bool {
    model_id.contains("vision") || model_id.contains("gpt-4o") || model_id.contains("turbo-vision")
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct OpenAiProvider {
    config: ProviderConfig,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(OpenAiProvider {
            config,
            base_url,
            client,
        })
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or(OPENAI_DEFAULT_TEXT_MODEL)
    }

    pub async fn generate(&self, inputs: &Inputs) -> Result<String, ProviderError> {
        let request = if inputs.images.is_empty() {
            self.text_request(&inputs.prompt)
        } else {
            self.vision_request(inputs)
        };

        info!(
            "OpenAI request: model={}, images={}",
            request.model,
            inputs.images.len()
        );

        let body = self.post_chat(&request).await?;
        parse_chat_response(&body)
    }

    fn text_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Text(prompt.to_string()),
            }],
            max_tokens: MAX_TOKENS,
        }
    }

    /// Builds the block-array payload: one text block, then one image block
    /// per attachment as a base64 data URL. Always uses the vision model.
    fn vision_request(&self, inputs: &Inputs) -> ChatRequest {
        let mut content = vec![ContentBlock::Text {
            text: inputs.prompt.clone(),
        }];

        for image in &inputs.images {
            let encoded = BASE64.encode(&image.data);
            content.push(ContentBlock::ImageUrl {
                image_url: ImageUrl {
                    url: format!(
                        "data:image/{};base64,{}",
                        mime_from_filename(&image.filename),
                        encoded
                    ),
                },
            });
        }

        ChatRequest {
            model: OPENAI_VISION_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Blocks(content),
            }],
            max_tokens: MAX_TOKENS,
        }
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        debug!("OpenAI response status: {status}");

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status.as_u16(), body);
            return Err(extract_api_error(status.as_u16(), &body));
        }

        Ok(body)
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
            warn!("OpenAI model listing error: {} - {}", status.as_u16(), body);
            return Err(extract_api_error(status.as_u16(), &body));
        }

        let response: ModelsResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(response
            .data
            .into_iter()
            .map(|entry| Model {
                description: format!("{} ({})", entry.id, entry.owned_by),
                context_window: context_window_for(&entry.id),
                supports_vision: is_vision_model(&entry.id),
                id: entry.id,
            })
            .collect())
    }
}
