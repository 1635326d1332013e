use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use super::providers::{DeepSeekProvider, MistralProvider, OpenAiProvider};
use super::types::{Feature, Inputs, Model, ProviderConfig};

/// Errors that can occur during provider operations.
/// Variants carry enough info to determine retryability.
#[derive(Debug)]
pub enum ProviderError {
    /// Request needs a feature the provider does not support. Never reaches
    /// the network, never retried.
    Capability(String),
    /// Provider misconfigured (missing API key, bad client build). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// API returned a non-2xx response. Terminal for the call.
    Api { status: u16, message: String },
    /// Failed to parse a 2xx response body. Not retryable.
    Parse(String),
    /// A well-formed response that contains no choices.
    EmptyResult,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Capability(msg) => write!(f, "capability error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ProviderError::Parse(msg) => write!(f, "parse error: {msg}"),
            ProviderError::EmptyResult => write!(f, "no content in response"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Identifies one of the supported completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderName {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "deepseek")]
    DeepSeek,
    #[value(name = "mistral")]
    Mistral,
}

impl ProviderName {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderName::OpenAi => "openai",
            ProviderName::DeepSeek => "deepseek",
            ProviderName::Mistral => "mistral",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            ProviderName::OpenAi => "OPENAI_API_KEY",
            ProviderName::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderName::Mistral => "MISTRAL_API_KEY",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderName::OpenAi),
            "deepseek" => Ok(ProviderName::DeepSeek),
            "mistral" => Ok(ProviderName::Mistral),
            other => Err(ProviderError::Config(format!(
                "unknown provider: {other}. Supported: openai, deepseek, mistral"
            ))),
        }
    }
}

/// A configured completion backend behind the uniform generate/list contract.
///
/// Closed enum dispatch over the three supported services. Each variant owns
/// its own config and HTTP client; nothing is shared between variants.
pub enum Provider {
    OpenAi(OpenAiProvider),
    DeepSeek(DeepSeekProvider),
    Mistral(MistralProvider),
}

impl Provider {
    /// Builds the provider matching `name` from the given config.
    pub fn new(name: ProviderName, config: ProviderConfig) -> Result<Self, ProviderError> {
        match name {
            ProviderName::OpenAi => Ok(Provider::OpenAi(OpenAiProvider::new(config)?)),
            ProviderName::DeepSeek => Ok(Provider::DeepSeek(DeepSeekProvider::new(config)?)),
            ProviderName::Mistral => Ok(Provider::Mistral(MistralProvider::new(config)?)),
        }
    }

    pub fn name(&self) -> ProviderName {
        match self {
            Provider::OpenAi(_) => ProviderName::OpenAi,
            Provider::DeepSeek(_) => ProviderName::DeepSeek,
            Provider::Mistral(_) => ProviderName::Mistral,
        }
    }

    /// Answers whether a generate call needing `feature` will be attempted.
    /// Pure; no side effects.
    pub fn supports(&self, feature: Feature) -> bool {
        match self {
            Provider::OpenAi(_) => matches!(
                feature,
                Feature::TextGeneration | Feature::Vision | Feature::MultiModal
            ),
            Provider::DeepSeek(_) | Provider::Mistral(_) => {
                matches!(feature, Feature::TextGeneration)
            }
        }
    }

    /// Runs one generation request and returns the normalized content string.
    ///
    /// The capability gate runs before any network I/O: images on a provider
    /// without vision support fail immediately. The text-only variants take
    /// the bare prompt, so an image can never leak past this point.
    ///
    /// Dropping the returned future aborts the in-flight request; timeouts
    /// are enforced by each variant's HTTP client.
    pub async fn generate(&self, inputs: &Inputs) -> Result<String, ProviderError> {
        if !inputs.images.is_empty() && !self.supports(Feature::Vision) {
            return Err(ProviderError::Capability(format!(
                "{} does not support image analysis",
                self.name()
            )));
        }

        match self {
            Provider::OpenAi(p) => p.generate(inputs).await,
            Provider::DeepSeek(p) => p.generate(&inputs.prompt).await,
            Provider::Mistral(p) => p.generate(&inputs.prompt).await,
        }
    }

    /// Fetches the provider's model listing, normalized to [`Model`].
    pub async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
        match self {
            Provider::OpenAi(p) => p.list_models().await,
            Provider::DeepSeek(p) => p.list_models().await,
            Provider::Mistral(p) => p.list_models().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::ImageInput;

    fn test_config() -> ProviderConfig {
        ProviderConfig::new("test-key")
    }

    #[test]
    fn test_provider_name_round_trip() {
        for name in [
            ProviderName::OpenAi,
            ProviderName::DeepSeek,
            ProviderName::Mistral,
        ] {
            assert_eq!(name.as_str().parse::<ProviderName>().unwrap(), name);
        }
    }

    #[test]
    fn test_provider_name_parse_is_case_insensitive() {
        assert_eq!(
            "OpenAI".parse::<ProviderName>().unwrap(),
            ProviderName::OpenAi
        );
    }

    #[test]
    fn test_unknown_provider_name_is_config_error() {
        let err = "anthropic".parse::<ProviderName>().unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_openai_supports_all_features() {
        let provider = Provider::new(ProviderName::OpenAi, test_config()).unwrap();
        assert!(provider.supports(Feature::TextGeneration));
        assert!(provider.supports(Feature::Vision));
        assert!(provider.supports(Feature::MultiModal));
    }

    #[test]
    fn test_text_only_providers_reject_vision() {
        for name in [ProviderName::DeepSeek, ProviderName::Mistral] {
            let provider = Provider::new(name, test_config()).unwrap();
            assert!(provider.supports(Feature::TextGeneration));
            assert!(!provider.supports(Feature::Vision));
            assert!(!provider.supports(Feature::MultiModal));
        }
    }

    #[tokio::test]
    async fn test_generate_with_images_fails_fast_on_text_only_provider() {
        let provider = Provider::new(ProviderName::DeepSeek, test_config()).unwrap();
        let inputs = Inputs {
            prompt: "describe".to_string(),
            images: vec![ImageInput {
                data: vec![1, 2, 3],
                filename: "photo.png".to_string(),
            }],
        };
        let err = provider.generate(&inputs).await.unwrap_err();
        assert!(matches!(err, ProviderError::Capability(_)));
        assert!(err.to_string().contains("deepseek"));
    }

    #[test]
    fn test_error_display_includes_status() {
        let err = ProviderError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 429): rate limited");
    }
}
