//! Struct definitions for tiller configuration.

use crate::permissions::PermissionConfig;
use serde::{Deserialize, Serialize};

/// Root configuration, deserialized from `config.toml` or `tiller.toml`.
///
/// Every field is optional so a partial project file can be layered over
/// the global one; built-in defaults are applied when [`Settings`] are
/// resolved.
///
/// [`Settings`]: super::Settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Default provider name (e.g. "google", "openai").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Reasoning model for the default provider.
    #[serde(default)]
    pub model: Option<String>,
    /// Corrector provider and model.
    #[serde(default)]
    pub corrector: CorrectorConfig,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Turn budget.
    #[serde(default)]
    pub max_turns: Option<usize>,
    /// Wall-clock ceiling for `run_command`.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
    /// Snippets returned per search.
    #[serde(default)]
    pub search_results: Option<usize>,
    /// Transcript path.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Approval policy per capability.
    #[serde(default)]
    pub permissions: PermissionConfig,
    /// Lexical retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// `[corrector]` section. `provider = "none"` disables correction.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CorrectorConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub google: Option<ProviderEntry>,
    pub openai: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Environment variables take precedence.
    pub api_key: Option<String>,
    /// Custom base URL (proxies, self-hosted Ollama).
    pub base_url: Option<String>,
    /// Reasoning model to use with this provider.
    pub model: Option<String>,
}

/// `[retrieval]` section.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RetrievalConfig {
    /// Glob patterns of indexed file names.
    pub include: Option<Vec<String>>,
    /// Files larger than this are skipped.
    pub max_file_bytes: Option<u64>,
}
