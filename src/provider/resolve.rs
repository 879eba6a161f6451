//! Model resolution for the reasoning and corrector roles.
//!
//! Resolves which provider and model to use based on CLI flags, config file,
//! and hardcoded defaults. Supports `provider/model` shorthand syntax.

use anyhow::Result;

use super::kind::{default_corrector_model_for, default_model_for, ProviderKind};
use crate::config::Config;
use crate::constants::DEFAULT_PROVIDER;

/// Resolved provider + model pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Resolve the reasoning provider and model.
/// Priority: CLI flags > config > defaults.
///
/// Accepts these formats:
///   --model openai/gpt-4.1  (provider/model shorthand, only when --provider is omitted)
///   --provider openrouter --model "org/model-name"  (slash preserved as model name)
///   --provider anthropic  (uses `[provider.anthropic] model`, then the built-in default)
///   (nothing)  (uses `default_provider` and `model` from config, then defaults)
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    // Shorthand only applies when the prefix names a known provider
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            if let Ok(provider) = ProviderKind::from_str(prov) {
                return Ok(ModelSelection {
                    provider,
                    model: model.to_string(),
                });
            }
        }
    }

    let provider_str = cli_provider
        .or(config.default_provider.as_deref())
        .unwrap_or(DEFAULT_PROVIDER);
    let provider = ProviderKind::from_str(provider_str)?;

    // The top-level `model` belongs to the configured default provider
    let top_level = if cli_provider.is_none() {
        config.model.clone()
    } else {
        None
    };

    let model = cli_model
        .map(String::from)
        .or_else(|| config.provider_entry(provider).and_then(|e| e.model.clone()))
        .or(top_level)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_model_for(&provider).to_string());

    Ok(ModelSelection { provider, model })
}

/// Resolve the corrector provider and model, or `None` when disabled.
///
/// The provider defaults to the reasoning provider; `none` (from the CLI or
/// `[corrector] provider`) disables correction.
pub fn resolve_corrector(
    cli_corrector: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
    reasoning: &ModelSelection,
) -> Result<Option<ModelSelection>> {
    let named = cli_corrector.or(config.corrector.provider.as_deref());
    let provider = match named {
        Some(name) if name.eq_ignore_ascii_case("none") => return Ok(None),
        Some(name) => ProviderKind::from_str(name)?,
        None => reasoning.provider,
    };

    let model = cli_model
        .map(String::from)
        .or_else(|| config.corrector.model.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_corrector_model_for(&provider).to_string());

    Ok(Some(ModelSelection { provider, model }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml_text: &str) -> Config {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn test_defaults_to_google() {
        let sel = resolve_model(None, None, &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::Google);
        assert_eq!(sel.model, default_model_for(&ProviderKind::Google));
    }

    #[test]
    fn test_shorthand_only_for_known_prefix() {
        let sel = resolve_model(None, Some("openai/gpt-4o"), &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, "gpt-4o");

        let sel = resolve_model(None, Some("meta/llama"), &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::Google);
        assert_eq!(sel.model, "meta/llama");

        let sel = resolve_model(Some("openrouter"), Some("google/gemini-2.5-pro"), &Config::default())
            .unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenRouter);
        assert_eq!(sel.model, "google/gemini-2.5-pro");
    }

    #[test]
    fn test_config_model_precedence() {
        let cfg = config(
            r#"
default_provider = "anthropic"
model = "claude-opus-4-1"

[provider.openai]
model = "gpt-4o"
"#,
        );
        let sel = resolve_model(None, None, &cfg).unwrap();
        assert_eq!(sel, ModelSelection { provider: ProviderKind::Anthropic, model: "claude-opus-4-1".into() });

        // Switching provider on the command line drops the top-level model
        let sel = resolve_model(Some("openai"), None, &cfg).unwrap();
        assert_eq!(sel.model, "gpt-4o");
        let sel = resolve_model(Some("ollama"), None, &cfg).unwrap();
        assert_eq!(sel.model, default_model_for(&ProviderKind::Ollama));
    }

    #[test]
    fn test_corrector_follows_reasoner_unless_disabled() {
        let reasoning = ModelSelection { provider: ProviderKind::OpenAI, model: "gpt-4.1".into() };

        let sel = resolve_corrector(None, None, &Config::default(), &reasoning).unwrap().unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, default_corrector_model_for(&ProviderKind::OpenAI));

        assert!(resolve_corrector(Some("none"), None, &Config::default(), &reasoning).unwrap().is_none());

        let cfg = config("[corrector]\nprovider = \"NONE\"\n");
        assert!(resolve_corrector(None, None, &cfg, &reasoning).unwrap().is_none());
        // CLI wins over a disabled config
        let sel = resolve_corrector(Some("ollama"), Some("qwen"), &cfg, &reasoning).unwrap().unwrap();
        assert_eq!(sel, ModelSelection { provider: ProviderKind::Ollama, model: "qwen".into() });
    }
}
