//! The system directive sent as the first part of the seed turn.
//!
//! Describes the thought/action/observation loop, lists the capability
//! catalogue generated from [`CapabilityKind::ALL`], and embeds the project's
//! `RULES.md` when one exists.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::capability::{CapabilityKind, SideEffect};
use crate::constants::{FINISH_ACTION, RULES_FILENAME};
use crate::turn::Turn;

/// Project rules read from the root.
pub struct Rules {
    pub path: PathBuf,
    pub content: String,
}

/// Finds `RULES.md` at `root`, matching the file name case-insensitively.
///
/// Returns `Ok(None)` when there is no such file.
pub fn load_rules(root: &Path) -> Result<Option<Rules>> {
    let entries = fs::read_dir(root).with_context(|| format!("Failed to list {}", root.display()))?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().eq_ignore_ascii_case(RULES_FILENAME) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        return Ok(Some(Rules { path, content }));
    }
    Ok(None)
}

/// Builds the directive text.
pub fn system_directive(root: &Path, rules: Option<&str>) -> String {
    let mut text = String::from(
        "You are a careful coding agent working on a software project. Your goal is to \
complete the user's task by inspecting and changing the project one step at a time.

**How you work:**
You operate in a loop of Thought, Action, and Observation.
1. **Thought:** Reason about the task, break it into steps, and decide what to do next.
2. **Action:** Choose exactly ONE capability from the list below and give its arguments.
3. **Observation:** You receive the result of the action and use it for your next thought.

Every action except `finish` is shown to a human who may reject it. If an action is \
rejected, choose a different approach.

**Strategy:**
- Start with a search. For a new task your first action should almost always be `search`.
- Example: to \"add a health check endpoint\", a good first action is \
`search(query: \"existing API endpoints\")`.
- Read a file before you overwrite it. `write_file` replaces the whole file.

",
    );

    let _ = writeln!(text, "**Project context:**");
    let _ = writeln!(
        text,
        "- You are working inside `{}`. All paths and commands are relative to this directory; \
paths outside it are refused.",
        root.display()
    );
    text.push('\n');

    if let Some(rules) = rules {
        let _ = writeln!(text, "**Project rules:**");
        let _ = writeln!(text, "You MUST follow these rules from the project's {}:", RULES_FILENAME);
        text.push('\n');
        text.push_str(rules.trim_end());
        text.push_str("\n\n");
    }

    let _ = writeln!(text, "**Capabilities:**");
    for kind in CapabilityKind::ALL {
        let marker = match kind.side_effect() {
            SideEffect::Mutating => " (changes the project)",
            SideEffect::ReadOnly => "",
        };
        let _ = writeln!(text, "- `{}`: {}{}", kind.signature(), kind.description(), marker);
    }
    let _ = writeln!(
        text,
        "- `{}(final_summary: str)`: Use this when the task is complete to summarize what you did.",
        FINISH_ACTION
    );
    text.push('\n');

    text.push_str(
        "**Response format:**
Respond with a single JSON object and nothing else:
{\"thought\": \"your reasoning\", \"action\": {\"name\": \"capability_name\", \"args\": {\"arg\": \"value\"}}}

Begin!",
    );
    text
}

/// The single user turn that starts every run: directive, task and the
/// result of the upfront search.
pub fn seed_turn(directive: String, task: &str, initial_context: &str) -> Turn {
    Turn::user_parts(vec![
        directive,
        format!(
            "Here is the task: {}\n\nTo start, I have already searched the codebase for your task. \
Here are the results:\n\n{}",
            task, initial_context
        ),
    ])
}
