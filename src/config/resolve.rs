//! Environment variable substitution and API key resolution.

use super::types::{Config, ProviderEntry};
use crate::provider::ProviderKind;

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in [
            &mut self.default_provider,
            &mut self.model,
            &mut self.corrector.provider,
            &mut self.corrector.model,
            &mut self.log_file,
        ] {
            if let Some(value) = field {
                *value = Self::resolve_str(value);
            }
        }
        Self::resolve_provider_entry(&mut self.provider.google);
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.ollama);
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            for field in [&mut e.api_key, &mut e.base_url, &mut e.model] {
                if let Some(value) = field {
                    *value = Self::resolve_str(value);
                }
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Config entry for a provider, if present.
    pub fn provider_entry(&self, kind: ProviderKind) -> Option<&ProviderEntry> {
        match kind {
            ProviderKind::Google => self.provider.google.as_ref(),
            ProviderKind::OpenAI => self.provider.openai.as_ref(),
            ProviderKind::OpenRouter => self.provider.openrouter.as_ref(),
            ProviderKind::Anthropic => self.provider.anthropic.as_ref(),
            ProviderKind::Ollama => self.provider.ollama.as_ref(),
        }
    }

    /// Resolve API key for a provider: env var first, then config value.
    ///
    /// Empty values (an unset `{env:VAR}` placeholder) count as missing.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        for var in kind.key_vars() {
            if let Ok(val) = std::env::var(var) {
                if !val.is_empty() {
                    return Some(val);
                }
            }
        }

        self.provider_entry(kind)
            .and_then(|e| e.api_key.clone())
            .filter(|key| !key.is_empty())
    }

    /// Custom base URL for a provider, if configured.
    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        self.provider_entry(kind)
            .and_then(|e| e.base_url.as_deref())
            .filter(|url| !url.is_empty())
    }
}
