//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.quill/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::inference::{ProviderConfig, ProviderError, ProviderName};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub openai: ProviderSection,
    #[serde(default)]
    pub deepseek: ProviderSection,
    #[serde(default)]
    pub mistral: ProviderSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProviderSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl QuillConfig {
    fn section(&self, provider: ProviderName) -> &ProviderSection {
        match provider {
            ProviderName::OpenAi => &self.openai,
            ProviderName::DeepSeek => &self.deepseek,
            ProviderName::Mistral => &self.mistral,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.quill/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".quill").join("config.toml"))
}

/// Load config from `~/.quill/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `QuillConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<QuillConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(QuillConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(QuillConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: QuillConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Quill Configuration
# All settings are optional — defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_provider = "openai"        # "openai", "deepseek" or "mistral"
# default_model = "gpt-4"            # Overrides the provider's default text model
# timeout_secs = 30

# [openai]
# api_key = "sk-..."                 # Or set OPENAI_API_KEY env var
# base_url = "https://api.openai.com/v1"

# [deepseek]
# api_key = "sk-..."                 # Or set DEEPSEEK_API_KEY env var
# base_url = "https://api.deepseek.com/v1"

# [mistral]
# api_key = "..."                    # Or set MISTRAL_API_KEY env var
# base_url = "https://api.mistral.ai/v1"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the active provider: CLI flag → env → config file → openai.
pub fn resolve_provider(config: &QuillConfig, cli_provider: Option<ProviderName>) -> ProviderName {
    if let Some(provider) = cli_provider {
        return provider;
    }
    if let Ok(name) = std::env::var("QUILL_PROVIDER")
        && let Ok(provider) = name.parse()
    {
        return provider;
    }
    config
        .general
        .default_provider
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(ProviderName::OpenAi)
}

/// Resolve the API key for `provider`: CLI flag → env var → config file.
///
/// A missing key is a config error raised here, before any provider is
/// constructed or any HTTP request goes out.
pub fn resolve_api_key(
    config: &QuillConfig,
    provider: ProviderName,
    flag_key: Option<&str>,
) -> Result<String, ProviderError> {
    if let Some(key) = flag_key.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    if let Ok(key) = std::env::var(provider.api_key_env())
        && !key.is_empty()
    {
        return Ok(key);
    }
    if let Some(key) = config.section(provider).api_key.clone() {
        return Ok(key);
    }
    Err(ProviderError::Config(format!(
        "API key required for {provider}. Set via --apikey or {}",
        provider.api_key_env()
    )))
}

/// Assembles the full [`ProviderConfig`] for one invocation.
pub fn provider_config(
    config: &QuillConfig,
    provider: ProviderName,
    flag_key: Option<&str>,
    cli_model: Option<&str>,
    debug: bool,
) -> Result<ProviderConfig, ProviderError> {
    let api_key = resolve_api_key(config, provider, flag_key)?;
    Ok(ProviderConfig {
        api_key,
        model: cli_model
            .map(|m| m.to_string())
            .or_else(|| config.general.default_model.clone()),
        timeout_secs: config.general.timeout_secs,
        debug,
        base_url: config.section(provider).base_url.clone(),
    })
}
