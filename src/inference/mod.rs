pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{Provider, ProviderError, ProviderName};
pub use providers::{DeepSeekProvider, MistralProvider, OpenAiProvider};
pub use types::{Feature, ImageInput, Inputs, Model, ProviderConfig, mask_api_key};
