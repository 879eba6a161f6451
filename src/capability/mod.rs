//! The closed set of capabilities the model may invoke.
//!
//! Each capability is a variant of [`Capability`], decoded from an
//! [`Action`]'s name and arguments and executed through a single `match` in
//! [`CapabilityRegistry::execute`]. Every failure, including an unknown name,
//! comes back from [`Dispatch::dispatch`] as observation text rather than an
//! error, so the model can correct itself on the next turn.

pub mod delete_file;
pub mod list_directory;
pub mod path;
pub mod read_file;
pub mod run_command;
pub mod write_file;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::constants::{COMMAND_TIMEOUT_SECS, DEFAULT_SEARCH_RESULTS};
use crate::response::Action;
use crate::retrieval::Retriever;

pub use path::PathGuard;

/// Whether a capability can change the project or the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    ReadOnly,
    Mutating,
}

/// Static catalogue entry for each capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    ListDirectory,
    ReadFile,
    WriteFile,
    DeleteFile,
    RunCommand,
    Search,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 6] = [
        CapabilityKind::ListDirectory,
        CapabilityKind::ReadFile,
        CapabilityKind::WriteFile,
        CapabilityKind::DeleteFile,
        CapabilityKind::RunCommand,
        CapabilityKind::Search,
    ];

    /// Looks up a kind by action name, accepting the legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list_directory" | "list_files" => Some(Self::ListDirectory),
            "read_file" => Some(Self::ReadFile),
            "write_file" => Some(Self::WriteFile),
            "delete_file" => Some(Self::DeleteFile),
            "run_command" | "run_terminal_command" => Some(Self::RunCommand),
            "search" | "search_codebase" => Some(Self::Search),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListDirectory => "list_directory",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::DeleteFile => "delete_file",
            Self::RunCommand => "run_command",
            Self::Search => "search",
        }
    }

    pub fn side_effect(&self) -> SideEffect {
        match self {
            Self::WriteFile | Self::DeleteFile | Self::RunCommand => SideEffect::Mutating,
            Self::ListDirectory | Self::ReadFile | Self::Search => SideEffect::ReadOnly,
        }
    }

    /// Signature line shown to the model in the directive.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::ListDirectory => "list_directory(path: str) -> str",
            Self::ReadFile => "read_file(path: str) -> str",
            Self::WriteFile => "write_file(path: str, content: str) -> str",
            Self::DeleteFile => "delete_file(path: str) -> str",
            Self::RunCommand => "run_command(command: str) -> str",
            Self::Search => "search(query: str) -> str",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ListDirectory => "Lists the files and subdirectories of a directory.",
            Self::ReadFile => "Reads the content of a file.",
            Self::WriteFile => "Writes content to a file, overwriting it if it exists.",
            Self::DeleteFile => "Deletes a file.",
            Self::RunCommand => "Executes a shell command in the project root. Use for tests, linting, etc.",
            Self::Search => "Searches the codebase for snippets relevant to a query.",
        }
    }
}

fn current_dir() -> String {
    ".".into()
}

/// A decoded, ready-to-run capability invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "snake_case")]
pub enum Capability {
    #[serde(alias = "list_files")]
    ListDirectory {
        #[serde(default = "current_dir", alias = "directory")]
        path: String,
    },
    ReadFile {
        #[serde(alias = "filepath")]
        path: String,
    },
    WriteFile {
        #[serde(alias = "filepath")]
        path: String,
        content: String,
    },
    DeleteFile {
        #[serde(alias = "filepath")]
        path: String,
    },
    #[serde(alias = "run_terminal_command")]
    RunCommand { command: String },
    #[serde(alias = "search_codebase")]
    Search { query: String },
}

impl Capability {
    /// Decodes an action into a capability, or explains why it cannot run.
    pub fn from_action(action: &Action) -> Result<Self, CapabilityError> {
        if CapabilityKind::from_name(&action.name).is_none() {
            return Err(CapabilityError::NotFound(action.name.clone()));
        }
        let tagged = json!({ "name": action.name, "args": Value::Object(action.args.clone()) });
        serde_json::from_value(tagged).map_err(|e| CapabilityError::InvalidArgs {
            name: action.name.clone(),
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::ListDirectory { .. } => CapabilityKind::ListDirectory,
            Self::ReadFile { .. } => CapabilityKind::ReadFile,
            Self::WriteFile { .. } => CapabilityKind::WriteFile,
            Self::DeleteFile { .. } => CapabilityKind::DeleteFile,
            Self::RunCommand { .. } => CapabilityKind::RunCommand,
            Self::Search { .. } => CapabilityKind::Search,
        }
    }
}

/// Why a capability did not produce a normal result.
///
/// Rendered into observation text by [`Dispatch::dispatch`]; never surfaces
/// to the controller as an error.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Capability '{0}' not found.")]
    NotFound(String),
    #[error("Invalid arguments for '{name}': {reason}")]
    InvalidArgs { name: String, reason: String },
    #[error("Access denied. Path '{0}' is outside the project root.")]
    PathEscape(String),
    #[error("'{0}' not found.")]
    Missing(String),
    #[error("{0}")]
    Rejected(String),
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to execute command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Command timed out after {0} seconds.")]
    Timeout(u64),
    #[error("Command exited with status {code}.\n{output}")]
    CommandFailed { code: i32, output: String },
    #[error("Search failed: {0}")]
    Search(String),
}

/// Executes an action and reports the outcome as text.
#[async_trait::async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, action: &Action) -> String;
}

/// The built-in capabilities, bound to one project root.
pub struct CapabilityRegistry {
    guard: PathGuard,
    command_timeout: Duration,
    search_results: usize,
    retriever: Arc<dyn Retriever>,
}

impl CapabilityRegistry {
    /// Create a registry rooted at `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the project root does not exist.
    pub fn with_builtins(project_root: &Path, retriever: Arc<dyn Retriever>) -> anyhow::Result<Self> {
        let guard = PathGuard::new(project_root).map_err(|e| {
            anyhow::anyhow!("Project root {} is not accessible: {}", project_root.display(), e)
        })?;
        Ok(Self {
            guard,
            command_timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
            search_results: DEFAULT_SEARCH_RESULTS,
            retriever,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_search_results(mut self, k: usize) -> Self {
        self.search_results = k;
        self
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Run a decoded capability.
    pub async fn execute(&self, capability: Capability) -> Result<String, CapabilityError> {
        match capability {
            Capability::ListDirectory { path } => list_directory::execute(&self.guard, &path),
            Capability::ReadFile { path } => read_file::execute(&self.guard, &path),
            Capability::WriteFile { path, content } => {
                write_file::execute(&self.guard, &path, &content)
            }
            Capability::DeleteFile { path } => delete_file::execute(&self.guard, &path),
            Capability::RunCommand { command } => {
                run_command::execute(self.guard.root(), &command, self.command_timeout).await
            }
            Capability::Search { query } => self
                .retriever
                .search(&query, self.search_results)
                .map_err(|e| CapabilityError::Search(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Dispatch for CapabilityRegistry {
    async fn dispatch(&self, action: &Action) -> String {
        let result = match Capability::from_action(action) {
            Ok(capability) => {
                tracing::debug!(capability = capability.kind().name(), "dispatching");
                self.execute(capability).await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(capability = %action.name, args = %action.args_json(), error = %e, "capability failed");
                format!("Error: {}", e)
            }
        }
    }
}
