//! Provider kind enumeration and default model mapping.
//!
//! Defines [`ProviderKind`] which identifies which LLM backend to use,
//! and the default reasoning and corrector models for each provider.

use std::fmt;

use anyhow::{anyhow, Result};

use crate::constants::{
    DEFAULT_ANTHROPIC_CORRECTOR_MODEL, DEFAULT_ANTHROPIC_MODEL, DEFAULT_GEMINI_CORRECTOR_MODEL,
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_CORRECTOR_MODEL, DEFAULT_OPENAI_MODEL,
    DEFAULT_OPENROUTER_CORRECTOR_MODEL, DEFAULT_OPENROUTER_MODEL, OLLAMA_DEFAULT_MODEL,
};

/// Identifies which LLM provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Google (Gemini models).
    Google,
    /// OpenAI (GPT models).
    OpenAI,
    /// OpenRouter (multi-provider gateway).
    OpenRouter,
    /// Anthropic (Claude models).
    Anthropic,
    /// Ollama (local models via OpenAI-compatible API).
    Ollama,
}

impl ProviderKind {
    /// Parses a provider name string into a [`ProviderKind`].
    ///
    /// Matching is case-insensitive; `gemini` is accepted for Google.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!(
                "Unknown provider: {other}. Supported: google, openai, openrouter, anthropic, ollama"
            )),
        }
    }

    /// Config table and environment prefix for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAI => "openai",
            Self::OpenRouter => "openrouter",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Environment variables checked for the API key, in order.
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Google => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Self::OpenAI => &["OPENAI_API_KEY"],
            Self::OpenRouter => &["OPENROUTER_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Ollama => &[],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the default reasoning model for a given provider.
pub fn default_model_for(provider: &ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Google => DEFAULT_GEMINI_MODEL,
        ProviderKind::OpenAI => DEFAULT_OPENAI_MODEL,
        ProviderKind::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        ProviderKind::Ollama => OLLAMA_DEFAULT_MODEL,
    }
}

/// Returns the default corrector model for a given provider.
///
/// Usually a smaller, cheaper sibling of the reasoning model.
pub fn default_corrector_model_for(provider: &ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Google => DEFAULT_GEMINI_CORRECTOR_MODEL,
        ProviderKind::OpenAI => DEFAULT_OPENAI_CORRECTOR_MODEL,
        ProviderKind::OpenRouter => DEFAULT_OPENROUTER_CORRECTOR_MODEL,
        ProviderKind::Anthropic => DEFAULT_ANTHROPIC_CORRECTOR_MODEL,
        ProviderKind::Ollama => OLLAMA_DEFAULT_MODEL,
    }
}
