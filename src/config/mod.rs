//! Configuration types and path resolution for tiller.
//!
//! Tiller stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/tiller/config.toml` on Linux), optionally overridden per
//! project by a `tiller.toml`. The merged [`Config`] and the command-line
//! [`Overrides`] are frozen into one immutable [`Settings`] before the loop
//! starts.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::constants::{
    COMMAND_TIMEOUT_SECS, DEFAULT_MAX_TURNS, DEFAULT_SEARCH_RESULTS, RETRIEVAL_DEFAULT_INCLUDE,
    RETRIEVAL_MAX_FILE_BYTES,
};
use crate::permissions::PermissionPolicy;
use crate::provider::{resolve_corrector, resolve_model, ModelSelection};

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default global config file if none exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        Self::load_from(&Self::config_path()?, project_root)
    }

    pub(crate) fn load_from(global_path: &Path, project_root: &Path) -> Result<Self> {
        let global = Self::load_global(global_path)?;
        let project = Self::load_project(project_root)?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub corrector: Option<String>,
    pub corrector_model: Option<String>,
    pub max_turns: Option<usize>,
    pub log_file: Option<PathBuf>,
}

/// Effective, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Canonical project root every path capability is confined to.
    pub root: PathBuf,
    pub reasoner: ModelSelection,
    /// `None` when correction is disabled.
    pub corrector: Option<ModelSelection>,
    pub max_turns: usize,
    pub command_timeout: Duration,
    pub search_results: usize,
    pub log_file: PathBuf,
    pub permissions: PermissionPolicy,
    pub retrieval_include: Vec<String>,
    pub retrieval_max_file_bytes: u64,
}

impl Settings {
    /// Applies CLI > config > built-in default for every value.
    ///
    /// # Errors
    ///
    /// Unknown provider names, a missing project root, or zero-valued limits.
    pub fn resolve(config: &Config, root: &Path, overrides: &Overrides) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Project root {} does not exist", root.display()))?;
        if !root.is_dir() {
            bail!("Project root {} is not a directory", root.display());
        }

        let reasoner = resolve_model(
            overrides.provider.as_deref(),
            overrides.model.as_deref(),
            config,
        )?;
        let corrector = resolve_corrector(
            overrides.corrector.as_deref(),
            overrides.corrector_model.as_deref(),
            config,
            &reasoner,
        )?;

        let timeout_secs = config.command_timeout_secs.unwrap_or(COMMAND_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("command_timeout_secs must be at least 1");
        }
        let search_results = config.search_results.unwrap_or(DEFAULT_SEARCH_RESULTS);
        if search_results == 0 {
            bail!("search_results must be at least 1");
        }

        let log_file = match (&overrides.log_file, &config.log_file) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) if !path.is_empty() => PathBuf::from(path),
            _ => Config::default_log_path()?,
        };

        Ok(Self {
            root,
            reasoner,
            corrector,
            max_turns: overrides
                .max_turns
                .or(config.max_turns)
                .unwrap_or(DEFAULT_MAX_TURNS),
            command_timeout: Duration::from_secs(timeout_secs),
            search_results,
            log_file,
            permissions: PermissionPolicy::from_config(&config.permissions),
            retrieval_include: config.retrieval.include.clone().unwrap_or_else(|| {
                RETRIEVAL_DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect()
            }),
            retrieval_max_file_bytes: config
                .retrieval
                .max_file_bytes
                .unwrap_or(RETRIEVAL_MAX_FILE_BYTES),
        })
    }

    /// One-line summary for the transcript header.
    pub fn describe(&self) -> String {
        let corrector = match &self.corrector {
            Some(sel) => format!("{}/{}", sel.provider, sel.model),
            None => "none".to_string(),
        };
        format!(
            "reasoner={}/{} corrector={} root={} max_turns={}",
            self.reasoner.provider,
            self.reasoner.model,
            corrector,
            self.root.display(),
            self.max_turns
        )
    }
}
