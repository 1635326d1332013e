//! Output formatting for the CLI: the JSON result envelope and the
//! per-provider model tables. Results go to stdout; diagnostics go through
//! the log facade to stderr.

use serde::Serialize;

use crate::inference::{Model, ProviderName};

/// JSON envelope for `generate --json`. Failures are reported in-band;
/// the process still exits zero in JSON mode.
#[derive(Serialize, Debug)]
pub struct GenerateOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl GenerateOutput {
    pub fn from_result(result: &Result<String, String>, warnings: &[String]) -> Self {
        match result {
            Ok(content) => GenerateOutput {
                success: true,
                content: Some(content.clone()),
                error: None,
                warnings: warnings.to_vec(),
            },
            Err(message) => GenerateOutput {
                success: false,
                content: None,
                error: Some(message.clone()),
                warnings: warnings.to_vec(),
            },
        }
    }
}

/// Prints one provider's models as a fixed-width table.
pub fn render_table(provider: ProviderName, models: &[Model]) {
    println!("\n{} Models:", title_case(provider.as_str()));
    if models.is_empty() {
        println!("  No models available");
        return;
    }

    println!("┌──────────────────────┬──────────────────────┬──────────────┬─────────────┐");
    println!("│ Model ID             │ Description          │ Context Size │ Vision      │");
    println!("├──────────────────────┼──────────────────────┼──────────────┼─────────────┤");
    for model in models {
        println!(
            "│ {:<20} │ {:<20} │ {:<12} │ {:<11} │",
            truncate(&model.id, 20),
            truncate(&model.description, 20),
            model.context_window,
            model.supports_vision
        );
    }
    println!("└──────────────────────┴──────────────────────┴──────────────┴─────────────┘");
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_error() {
        let output = GenerateOutput::from_result(&Ok("hello".to_string()), &[]);
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"success":true,"content":"hello"}"#);
    }

    #[test]
    fn test_failure_envelope_carries_error_and_warnings() {
        let warnings = vec!["No .env file found".to_string()];
        let output =
            GenerateOutput::from_result(&Err("openai: network error: timeout".to_string()), &warnings);
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains(r#""success":false"#));
        assert!(json.contains(r#""error":"openai: network error: timeout""#));
        assert!(json.contains(r#""warnings":["No .env file found"]"#));
        assert!(!json.contains("content"));
    }

    #[test]
    fn test_truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("gpt-4", 20), "gpt-4");
    }

    #[test]
    fn test_truncate_clips_long_strings_with_ellipsis() {
        let clipped = truncate("a-very-long-model-identifier-string", 20);
        assert_eq!(clipped.chars().count(), 20);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("openai"), "Openai");
        assert_eq!(title_case(""), "");
    }
}
