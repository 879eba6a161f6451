//! Conversation history for the turn loop.
//!
//! A [`Turn`] is one message in the prompt context: a [`Role`] and an ordered
//! list of text parts. [`History`] only ever grows; it exposes no way to edit,
//! remove, or reorder turns once appended.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single immutable entry in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    parts: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![text.into()],
        }
    }

    /// A user turn carrying several text blocks (the seed turn uses this).
    pub fn user_parts(parts: Vec<String>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    #[cfg(test)]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// All parts joined with a blank line, as sent to chat-style backends.
    pub fn text(&self) -> String {
        self.parts.join("\n\n")
    }
}

/// Append-only conversation history owned by the controller.
#[derive(Debug, Default, Clone)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
