//! rig-core backed implementation of [`Reasoner`] and [`Corrector`].
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch, keeping provider-specific details out of the
//! controller. Supports Google, OpenAI, OpenRouter, Anthropic, and Ollama.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{Chat, Prompt};
use rig::message::Message as RigMessage;
use rig::providers::{anthropic, gemini, openai, openrouter};

use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use super::{Corrector, Reasoner};
use crate::config::Config;
use crate::constants::{CORRECTOR_PREAMBLE, CORRECTOR_TEMPERATURE, REASONING_TEMPERATURE};
use crate::turn::{Role, Turn};

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Google(gemini::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Anthropic(anthropic::Client),
    Ollama(openai::Client),
}

/// A configured LLM provider for one role.
///
/// Agents are constructed on each call since they are cheap to create; the
/// role only decides the sampling temperature and the preamble.
pub struct Provider {
    client: ClientKind,
    model: String,
    temperature: f64,
    preamble: Option<&'static str>,
}

/// Builds an agent from the given client, model, temperature and optional
/// preamble, then executes the provided block with the agent bound to `$agent`.
macro_rules! with_agent {
    ($client:expr, $model:expr, $temperature:expr, $sys:expr, |$agent:ident| $body:expr) => {{
        let $agent = if let Some(sys) = $sys {
            $client
                .agent($model)
                .preamble(sys)
                .temperature($temperature)
                .max_tokens(crate::constants::MAX_TOKENS)
                .build()
        } else {
            $client
                .agent($model)
                .temperature($temperature)
                .max_tokens(crate::constants::MAX_TOKENS)
                .build()
        };
        $body
    }};
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Google($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Anthropic($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

impl Provider {
    /// Provider for the reasoning role.
    pub fn reasoner(config: &Config, selection: &ModelSelection) -> Result<Self> {
        Self::from_config(config, selection, REASONING_TEMPERATURE, None)
    }

    /// Provider for the JSON corrector role.
    pub fn corrector(config: &Config, selection: &ModelSelection) -> Result<Self> {
        Self::from_config(
            config,
            selection,
            CORRECTOR_TEMPERATURE,
            Some(CORRECTOR_PREAMBLE),
        )
    }

    /// Resolves the API key through the config precedence chain
    /// (env var → config file → substitution) and builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    fn from_config(
        config: &Config,
        selection: &ModelSelection,
        temperature: f64,
        preamble: Option<&'static str>,
    ) -> Result<Self> {
        let kind = selection.provider;
        let client = match kind {
            ProviderKind::Google => {
                let api_key = require_key(config, kind)?;
                ClientKind::Google(
                    gemini::Client::new(&api_key).context("Failed to create Gemini client")?,
                )
            }
            ProviderKind::OpenAI => {
                let api_key = require_key(config, kind)?;
                let client = match config.base_url(kind) {
                    Some(url) => openai::Client::builder()
                        .api_key(api_key.as_str())
                        .base_url(url)
                        .build()
                        .context("Failed to create OpenAI client")?,
                    None => openai::Client::new(&api_key)
                        .context("Failed to create OpenAI client")?,
                };
                ClientKind::OpenAI(client)
            }
            ProviderKind::OpenRouter => {
                let api_key = require_key(config, kind)?;
                ClientKind::OpenRouter(
                    openrouter::Client::new(&api_key)
                        .context("Failed to create OpenRouter client")?,
                )
            }
            ProviderKind::Anthropic => {
                let api_key = require_key(config, kind)?;
                ClientKind::Anthropic(
                    anthropic::Client::new(&api_key)
                        .context("Failed to create Anthropic client")?,
                )
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .base_url(kind)
                    .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);
                let client = openai::Client::builder()
                    .api_key("ollama")
                    .base_url(format!("{}/v1", base_url.trim_end_matches('/')))
                    .build()
                    .context("Failed to create Ollama client")?;
                ClientKind::Ollama(client)
            }
        };

        tracing::debug!(provider = %kind, model = %selection.model, temperature, "provider ready");
        Ok(Self {
            client,
            model: selection.model.clone(),
            temperature,
            preamble,
        })
    }
}

fn require_key(config: &Config, kind: ProviderKind) -> Result<String> {
    config.resolve_api_key(kind).with_context(|| {
        format!(
            "No API key found for {}. Set {} or configure it in config.toml",
            kind,
            kind.key_vars().join(" or ")
        )
    })
}

/// Converts a [`Turn`] to a rig-core message, keeping its role.
fn to_rig(turn: &Turn) -> RigMessage {
    match turn.role() {
        Role::User => RigMessage::user(turn.text()),
        Role::Model => RigMessage::assistant(turn.text()),
    }
}

#[async_trait]
impl Reasoner for Provider {
    /// The last turn becomes the prompt; everything before it is chat history.
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let (last, earlier) = history
            .split_last()
            .context("Cannot generate a response from an empty history")?;
        let prompt = last.text();
        let chat_history: Vec<RigMessage> = earlier.iter().map(to_rig).collect();

        dispatch!(self, |client| {
            let response = with_agent!(client, &self.model, self.temperature, self.preamble, |agent| {
                agent.chat(prompt, chat_history).await
            });
            Ok(response?)
        })
    }
}

#[async_trait]
impl Corrector for Provider {
    async fn correct(&self, raw: &str) -> Result<String> {
        dispatch!(self, |client| {
            let response = with_agent!(client, &self.model, self.temperature, self.preamble, |agent| {
                agent.prompt(raw).await
            });
            Ok(response?)
        })
    }
}
