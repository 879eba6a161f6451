//! Human approval before an action is dispatched.
//!
//! [`ApprovalGate`] combines the [`PermissionPolicy`] with a preview of the
//! proposed action (a unified diff for file writes and deletions, a plain
//! description otherwise) and a [`Confirm`] implementation that asks the user.
//! [`TerminalConfirmer`] reads one line from the terminal; tests inject a
//! scripted confirmer instead.

use std::fs;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;

use crate::capability::{Capability, PathGuard};
use crate::constants::PREVIEW_ARG_MAX_CHARS;
use crate::diff;
use crate::output::Renderer;
use crate::permissions::{Permission, PermissionPolicy};
use crate::response::Action;

/// The user's answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
    /// Ctrl+C (or a closed input stream) while waiting for the answer.
    Interrupted,
}

/// `confirm(prompt) → decision`. Blocks until the user answers.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Decision;
}

/// What the gate decided for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
    /// Disabled by configuration; the user was not asked.
    Denied,
    Interrupted,
}

/// Reads a single-line answer from the terminal via rustyline.
pub struct TerminalConfirmer {
    editor: DefaultEditor,
}

impl TerminalConfirmer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

/// Only an explicit `y` (or `yes`) approves.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl Confirm for TerminalConfirmer {
    fn confirm(&mut self, prompt: &str) -> Decision {
        match self.editor.readline(prompt) {
            Ok(line) if is_affirmative(&line) => Decision::Approved,
            Ok(_) => Decision::Rejected,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Decision::Interrupted,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read approval answer; treating as rejection");
                Decision::Rejected
            }
        }
    }
}

/// Gate every non-terminal action passes through before dispatch.
pub struct ApprovalGate {
    policy: PermissionPolicy,
    guard: PathGuard,
    confirmer: Box<dyn Confirm>,
}

impl ApprovalGate {
    pub fn new(policy: PermissionPolicy, guard: PathGuard, confirmer: Box<dyn Confirm>) -> Self {
        Self {
            policy,
            guard,
            confirmer,
        }
    }

    /// Shows the preview and asks for confirmation, unless policy decides.
    pub fn request_approval(&mut self, action: &Action, renderer: &mut dyn Renderer) -> Verdict {
        match self.policy.check(&action.name) {
            Permission::Deny => return Verdict::Denied,
            Permission::Allow => return Verdict::Approved,
            Permission::Ask => {}
        }

        let (title, body) = self.preview(action);
        renderer.preview(&title, &body);

        match self.confirmer.confirm("Approve this action? (y/n): ") {
            Decision::Approved => Verdict::Approved,
            Decision::Rejected => Verdict::Rejected,
            Decision::Interrupted => Verdict::Interrupted,
        }
    }

    /// Title and body of the preview for `action`.
    pub fn preview(&self, action: &Action) -> (String, String) {
        match Capability::from_action(action) {
            Ok(Capability::WriteFile { path, content }) => {
                self.file_preview(&path, Some(&content), "Proposed changes for")
            }
            Ok(Capability::DeleteFile { path }) => self.file_preview(&path, None, "Proposed deletion of"),
            Ok(Capability::RunCommand { command }) => (
                "Run shell command".to_string(),
                format!("$ {}\n(in {})", command, self.guard.root().display()),
            ),
            _ => (format!("Call {}", action.name), describe_args(action)),
        }
    }

    /// Diff preview for a write (`new = Some`) or delete (`new = None`).
    fn file_preview(&self, path: &str, new: Option<&str>, verb: &str) -> (String, String) {
        let title = format!("{} {}", verb, path);
        let resolved = match self.guard.resolve(path) {
            Ok(p) => p,
            Err(e) => return (title, format!("{} The capability will refuse this path.", e)),
        };
        let display = self.guard.display_path(&resolved);
        let existing = fs::read_to_string(&resolved).ok();

        let body = match (new, existing.as_deref()) {
            (Some(content), old) => {
                let diff = diff::unified_diff(old, content, &display);
                if diff.is_empty() {
                    "No changes detected.".to_string()
                } else {
                    diff
                }
            }
            (None, Some("")) => "(empty file)".to_string(),
            (None, Some(old)) => diff::unified_diff(Some(old), "", &display),
            (None, None) if resolved.exists() => "(binary or unreadable file)".to_string(),
            (None, None) => "File does not exist.".to_string(),
        };
        (title, body)
    }
}

/// `key: value` lines with long values shortened.
fn describe_args(action: &Action) -> String {
    if action.args.is_empty() {
        return "(no arguments)".to_string();
    }
    action
        .args
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let shown = if text.chars().count() > PREVIEW_ARG_MAX_CHARS {
                let cut: String = text.chars().take(PREVIEW_ARG_MAX_CHARS).collect();
                format!("{}...", cut)
            } else {
                text
            };
            format!("{}: {}", key, shown)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
