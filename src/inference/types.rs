use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default request timeout applied when the config does not specify one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A capability a provider may or may not support.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    TextGeneration,
    Vision,
    MultiModal,
}

/// One image attachment: raw bytes plus the original filename.
/// The filename is only used to derive a mime type; the core never reads disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub filename: String,
}

/// One generation request: a prompt and zero or more image attachments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    pub prompt: String,
    pub images: Vec<ImageInput>,
}

impl Inputs {
    /// Builds a text-only request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Inputs {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }
}

/// Normalized descriptor of a provider-hosted model.
/// Produced only by model listing; immutable once constructed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    pub id: String,
    pub description: String,
    /// Context window in tokens. Heuristically inferred for providers whose
    /// listing endpoint does not report it.
    pub context_window: u32,
    pub supports_vision: bool,
}

/// Per-provider construction parameters.
/// Created once per CLI invocation and passed by value into the provider;
/// never mutated afterward. The API key must not appear in logs unmasked.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the provider's default text model. Vision requests ignore it.
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub debug: bool,
    /// Overrides the provider's base URL. Used by the config file and tests.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        ProviderConfig {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Request timeout as a [`Duration`], falling back to the 30s default.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Masks an API key for log output, keeping only the outer characters.
pub fn mask_api_key(key: &str) -> String {
    if key.len() < 8 {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_text_has_no_images() {
        let inputs = Inputs::text("hello");
        assert_eq!(inputs.prompt, "hello");
        assert!(inputs.images.is_empty());
    }

    #[test]
    fn test_timeout_defaults_to_thirty_seconds() {
        let config = ProviderConfig::new("key");
        assert_eq!(config.timeout(), Duration::from_secs(30));

        let config = ProviderConfig {
            timeout_secs: Some(5),
            ..ProviderConfig::new("key")
        };
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_mask_api_key_keeps_outer_chars() {
        assert_eq!(mask_api_key("sk-abcdefgh1234"), "sk-a...1234");
    }

    #[test]
    fn test_mask_api_key_short_keys_fully_hidden() {
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key(""), "****");
    }

    #[test]
    fn test_model_serializes_with_snake_case_fields() {
        let model = Model {
            id: "gpt-4".to_string(),
            description: "gpt-4 (openai)".to_string(),
            context_window: 8192,
            supports_vision: false,
        };
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains(r#""id":"gpt-4""#));
        assert!(json.contains(r#""context_window":8192"#));
        assert!(json.contains(r#""supports_vision":false"#));
    }
}
