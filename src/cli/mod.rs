//! Command-line interface definition and dispatch for quill.
//!
//! Uses [`clap`] derive macros. This layer owns everything the provider core
//! must not touch: flag parsing, `.env` loading, reading image files from
//! disk, API-key resolution, and output formatting.

pub mod output;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, warn};

use crate::core::config::{self, QuillConfig};
use crate::inference::{ImageInput, Inputs, Model, Provider, ProviderName};

/// Top-level CLI structure for quill.
#[derive(Parser)]
#[command(
    name = "quill",
    about = "AI-powered CLI for multimodal generation",
    long_about = "Dispatches text and image prompts to OpenAI, DeepSeek or Mistral \
                  through a uniform interface.\n\n\
                  Examples:\n  \
                  $ quill generate -p \"Explain quantum computing\"\n  \
                  $ quill generate -p \"Describe this image\" -i photo.jpg\n  \
                  $ quill models --provider openai,mistral --json"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate responses using AI models
    #[command(visible_aliases = ["gen", "ask"])]
    Generate(GenerateArgs),
    /// List available models for supported providers
    Models(ModelsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Text prompt
    #[arg(short, long)]
    pub prompt: String,
    /// Image paths (vision-capable providers only)
    #[arg(short, long = "images", value_name = "PATH")]
    pub images: Vec<PathBuf>,
    /// AI provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderName>,
    /// API key (overrides environment variable and config file)
    #[arg(short = 'k', long)]
    pub apikey: Option<String>,
    /// Model override (ignored by vision requests)
    #[arg(short, long)]
    pub model: Option<String>,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ModelsArgs {
    /// Comma-separated list of providers (defaults to openai,deepseek)
    #[arg(long = "provider", value_enum, value_delimiter = ',')]
    pub providers: Vec<ProviderName>,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Generate(args) => generate(args, cli.debug).await,
        Commands::Models(args) => models(args, cli.debug).await,
    }
}

// ============================================================================
// generate
// ============================================================================

async fn generate(args: GenerateArgs, debug: bool) -> ExitCode {
    let mut warnings = Vec::new();
    if dotenv::dotenv().is_err() {
        warnings.push("No .env file found".to_string());
    }

    let config = load_config_or_default(&mut warnings);
    let result = run_generate(&config, &args, debug).await;

    if args.json {
        let envelope = output::GenerateOutput::from_result(&result, &warnings);
        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("failed to encode output: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    for warning in &warnings {
        warn!("{warning}");
    }
    match result {
        Ok(content) => {
            println!("{content}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run_generate(
    config: &QuillConfig,
    args: &GenerateArgs,
    debug: bool,
) -> Result<String, String> {
    let inputs = read_inputs(&args.prompt, &args.images)
        .map_err(|e| format!("input validation failed: {e}"))?;

    let name = config::resolve_provider(config, args.provider);
    let provider_config =
        config::provider_config(config, name, args.apikey.as_deref(), args.model.as_deref(), debug)
            .map_err(|e| format!("provider setup failed: {e}"))?;
    let provider =
        Provider::new(name, provider_config).map_err(|e| format!("provider setup failed: {e}"))?;

    provider
        .generate(&inputs)
        .await
        .map_err(|e| format!("{name}: {e}"))
}

/// Reads image attachments from disk. The only file I/O in the crate; the
/// provider core receives bytes it never has to load itself.
fn read_inputs(prompt: &str, images: &[PathBuf]) -> Result<Inputs, String> {
    let mut attachments = Vec::with_capacity(images.len());
    for path in images {
        let data = std::fs::read(path)
            .map_err(|e| format!("failed to read image {}: {e}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        attachments.push(ImageInput { data, filename });
    }
    Ok(Inputs {
        prompt: prompt.to_string(),
        images: attachments,
    })
}

// ============================================================================
// models
// ============================================================================

async fn models(args: ModelsArgs, debug: bool) -> ExitCode {
    let _ = dotenv::dotenv();

    let mut warnings = Vec::new();
    let config = load_config_or_default(&mut warnings);
    for warning in &warnings {
        warn!("{warning}");
    }

    let providers = if args.providers.is_empty() {
        vec![ProviderName::OpenAi, ProviderName::DeepSeek]
    } else {
        args.providers.clone()
    };

    // Each provider is queried independently; one failure never aborts the rest.
    let mut provider_models: BTreeMap<&'static str, Vec<Model>> = BTreeMap::new();
    for name in providers {
        match list_for(&config, name, debug).await {
            Ok(models) => {
                provider_models.insert(name.as_str(), models);
            }
            Err(message) => error!("{message}"),
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&provider_models) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("failed to encode output: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for (name, models) in &provider_models {
            if let Ok(provider) = name.parse::<ProviderName>() {
                output::render_table(provider, models);
            }
            println!();
        }
    }
    ExitCode::SUCCESS
}

async fn list_for(
    config: &QuillConfig,
    name: ProviderName,
    debug: bool,
) -> Result<Vec<Model>, String> {
    let provider_config = config::provider_config(config, name, None, None, debug)
        .map_err(|e| format!("{name}: {e}"))?;
    let provider = Provider::new(name, provider_config).map_err(|e| format!("{name}: {e}"))?;
    provider
        .list_models()
        .await
        .map_err(|e| format!("{name}: {e}"))
}

// ============================================================================
// shared
// ============================================================================

fn load_config_or_default(warnings: &mut Vec<String>) -> QuillConfig {
    match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            warnings.push(format!("config file ignored: {e}"));
            QuillConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inputs_without_images() {
        let inputs = read_inputs("hello", &[]).unwrap();
        assert_eq!(inputs.prompt, "hello");
        assert!(inputs.images.is_empty());
    }

    #[test]
    fn test_read_inputs_missing_file_is_validation_error() {
        let missing = PathBuf::from("/nonexistent/image.png");
        let err = read_inputs("hello", &[missing]).unwrap_err();
        assert!(err.contains("failed to read image"));
        assert!(err.contains("/nonexistent/image.png"));
    }

    #[test]
    fn test_read_inputs_keeps_only_the_basename() {
        let dir = std::env::temp_dir().join("quill-cli-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("photo.png");
        std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let inputs = read_inputs("describe", std::slice::from_ref(&path)).unwrap();
        assert_eq!(inputs.images.len(), 1);
        assert_eq!(inputs.images[0].filename, "photo.png");
        assert_eq!(inputs.images[0].data, vec![0x89, 0x50, 0x4E, 0x47]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cli_parses_generate_aliases() {
        for alias in ["generate", "gen", "ask"] {
            let cli = Cli::try_parse_from(["quill", alias, "-p", "hi"]).unwrap();
            assert!(matches!(cli.command, Commands::Generate(_)));
        }
    }

    #[test]
    fn test_cli_parses_comma_separated_providers() {
        let cli = Cli::try_parse_from(["quill", "models", "--provider", "openai,mistral"]).unwrap();
        match cli.command {
            Commands::Models(args) => {
                assert_eq!(
                    args.providers,
                    vec![ProviderName::OpenAi, ProviderName::Mistral]
                );
            }
            _ => panic!("expected models subcommand"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["quill", "gen", "-p", "hi", "--provider", "claude"]).is_err());
    }
}
