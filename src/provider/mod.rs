//! LLM provider abstraction for tiller.
//!
//! The controller only sees the [`Reasoner`] and [`Corrector`] traits.
//! [`Provider`] implements both on top of rig-core clients, selected by
//! [`ProviderKind`]; one instance is built per role.

mod client;
mod kind;
mod resolve;

use anyhow::Result;
use async_trait::async_trait;

use crate::turn::Turn;

pub use client::Provider;
pub use kind::ProviderKind;
pub use resolve::{resolve_corrector, resolve_model, ModelSelection};

/// `generate(history) → raw_text`.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn generate(&self, history: &[Turn]) -> Result<String>;
}

/// `correct(raw_text) → corrected_text`. Asked to turn malformed output into
/// valid structured JSON.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct(&self, raw: &str) -> Result<String>;
}
