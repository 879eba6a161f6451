//! Stable exit codes for the tiller CLI.

/// Task finished, turn budget ran out, or the user cancelled.
pub const OK: i32 = 0;
/// A reasoning or corrector call failed mid-run.
pub const FATAL: i32 = 1;
/// Configuration could not be resolved before the loop started.
pub const CONFIG: i32 = 2;
