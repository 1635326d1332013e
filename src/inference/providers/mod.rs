pub mod deepseek;
pub mod mistral;
pub mod openai;

pub use deepseek::DeepSeekProvider;
pub use mistral::MistralProvider;
pub use openai::OpenAiProvider;
