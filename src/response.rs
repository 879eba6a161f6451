//! Structured model responses and the parser that produces them.
//!
//! The model is instructed to answer with a JSON object of the shape
//! `{"thought": "...", "action": {"name": "...", "args": {...}}}`. [`parse`]
//! strips an optional fenced-code wrapper and decodes strictly; anything else
//! is a [`ParseFailure`] carrying the raw text for the recovery protocol.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::FINISH_ACTION;

/// Matches a whole response wrapped in a fenced code block, with or without a language tag.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?```$").expect("valid fence regex")
});

/// An action requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(alias = "tool_name")]
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl Action {
    pub fn is_finish(&self) -> bool {
        self.name == FINISH_ACTION
    }

    /// Returns a string argument, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    /// Compact JSON rendering of the arguments, used in logs and previews.
    pub fn args_json(&self) -> String {
        Value::Object(self.args.clone()).to_string()
    }
}

/// A successfully decoded model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(default)]
    pub thought: String,
    pub action: Action,
}

impl StructuredResponse {
    /// The verbatim form recorded as the model turn in history.
    pub fn to_turn_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Raw model output that could not be decoded.
#[derive(Debug, Clone, Error)]
#[error("malformed model output: {reason}")]
pub struct ParseFailure {
    pub raw: String,
    pub reason: String,
}

/// Removes a fenced-code wrapper around the whole response, if any.
pub fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Decodes raw model output into a [`StructuredResponse`].
pub fn parse(raw: &str) -> Result<StructuredResponse, ParseFailure> {
    let body = strip_fence(raw);
    let response: StructuredResponse =
        serde_json::from_str(body).map_err(|e| ParseFailure {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;

    if response.action.name.trim().is_empty() {
        return Err(ParseFailure {
            raw: raw.to_string(),
            reason: "action name is empty".into(),
        });
    }
    Ok(response)
}
