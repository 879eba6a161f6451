//! Entry point for tiller, an approval-gated coding agent for the terminal.
//!
//! This binary loads environment variables, initializes diagnostics, parses
//! CLI arguments via [`cli`], runs the task and exits with a stable code.

mod approval;
mod capability;
mod cli;
mod config;
mod constants;
mod controller;
mod diff;
mod directive;
mod exit_codes;
mod logging;
mod output;
mod permissions;
mod provider;
mod response;
mod retrieval;
mod transcript;
mod turn;

/// Runs the tiller CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and runs the task via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();
    let cli = cli::parse();
    let code = cli::run(cli).await;
    std::process::exit(code);
}
