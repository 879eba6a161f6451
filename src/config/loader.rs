//! File loading and merging for tiller configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{Config, CorrectorConfig, ProviderConfig, ProviderEntry, RetrievalConfig};
use crate::permissions::PermissionConfig;

const DEFAULT_CONFIG: &str = r#"default_provider = "google"

[corrector]
# provider = "none" disables the JSON corrector

[provider.google]
api_key = "{env:GOOGLE_API_KEY}"

[provider.openai]
api_key = "{env:OPENAI_API_KEY}"

[provider.openrouter]
api_key = "{env:OPENROUTER_API_KEY}"

[provider.anthropic]
api_key = "{env:ANTHROPIC_API_KEY}"

[provider.ollama]
base_url = "http://localhost:11434"

[permissions.capabilities]
# read_file = "allow"
# run_command = "deny"
"#;

impl Config {
    /// Loads the global config from `path`.
    ///
    /// If no file exists, writes one with `{env:VAR}` placeholders for API
    /// keys and returns it.
    pub(super) fn load_global(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config =
                toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")?;
            return Ok(config);
        }

        Self::read(path)
    }

    /// Look for `tiller.toml` in `start`, then walk up to the git root.
    pub(super) fn load_project(start: &Path) -> Result<Option<Config>> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.is_file() {
                return Self::read(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut capabilities = global.permissions.capabilities;
        capabilities.extend(project.permissions.capabilities);

        Config {
            default_provider: project.default_provider.or(global.default_provider),
            model: project.model.or(global.model),
            corrector: CorrectorConfig {
                provider: project.corrector.provider.or(global.corrector.provider),
                model: project.corrector.model.or(global.corrector.model),
            },
            provider: ProviderConfig {
                google: merge_entry(global.provider.google, project.provider.google),
                openai: merge_entry(global.provider.openai, project.provider.openai),
                openrouter: merge_entry(global.provider.openrouter, project.provider.openrouter),
                anthropic: merge_entry(global.provider.anthropic, project.provider.anthropic),
                ollama: merge_entry(global.provider.ollama, project.provider.ollama),
            },
            max_turns: project.max_turns.or(global.max_turns),
            command_timeout_secs: project.command_timeout_secs.or(global.command_timeout_secs),
            search_results: project.search_results.or(global.search_results),
            log_file: project.log_file.or(global.log_file),
            permissions: PermissionConfig { capabilities },
            retrieval: RetrievalConfig {
                include: project.retrieval.include.or(global.retrieval.include),
                max_file_bytes: project
                    .retrieval
                    .max_file_bytes
                    .or(global.retrieval.max_file_bytes),
            },
        }
    }
}

fn merge_entry(global: Option<ProviderEntry>, project: Option<ProviderEntry>) -> Option<ProviderEntry> {
    match (global, project) {
        (Some(g), Some(p)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (g, p) => p.or(g),
    }
}
