//! Per-capability approval policy.
//!
//! Every capability defaults to [`Permission::Ask`]. Read-only capabilities
//! may be configured to run without a prompt; any capability may be disabled.
//! Mutating capabilities always go through the prompt, so `allow` on one of
//! them is downgraded to `ask`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capability::{CapabilityKind, SideEffect};

/// Permission level for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Ask,
    Deny,
}

/// `[permissions]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// Per-capability permissions: capability name -> Permission
    #[serde(default)]
    pub capabilities: HashMap<String, Permission>,
}

/// Resolved, immutable policy used by the approval gate.
#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    overrides: HashMap<&'static str, Permission>,
}

impl PermissionPolicy {
    /// Builds the policy from config, ignoring names that are not capabilities.
    pub fn from_config(config: &PermissionConfig) -> Self {
        let mut overrides = HashMap::new();
        for (name, permission) in &config.capabilities {
            match CapabilityKind::from_name(name) {
                Some(kind) => {
                    let effective = Self::clamp(kind, *permission);
                    if effective != *permission {
                        tracing::warn!(capability = kind.name(), "mutating capability cannot be auto-approved; using ask");
                    }
                    overrides.insert(kind.name(), effective);
                }
                None => tracing::warn!(capability = %name, "ignoring permission for unknown capability"),
            }
        }
        Self { overrides }
    }

    /// Permission for an action name. Unknown names are asked about, so the
    /// user sees the hallucinated call before it fails softly.
    pub fn check(&self, name: &str) -> Permission {
        match CapabilityKind::from_name(name) {
            Some(kind) => self.overrides.get(kind.name()).copied().unwrap_or(Permission::Ask),
            None => Permission::Ask,
        }
    }

    fn clamp(kind: CapabilityKind, permission: Permission) -> Permission {
        match (kind.side_effect(), permission) {
            (SideEffect::Mutating, Permission::Allow) => Permission::Ask,
            (_, p) => p,
        }
    }
}
