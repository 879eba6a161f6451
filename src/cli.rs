//! Command-line interface definition and run wiring for tiller.
//!
//! Uses [`clap`] derive macros for argument parsing. [`run`] resolves the
//! configuration, builds the collaborators the controller needs, runs the
//! loop once and maps the [`Outcome`] to a process exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use crate::approval::{ApprovalGate, TerminalConfirmer};
use crate::capability::CapabilityRegistry;
use crate::config::{Config, Overrides, Settings};
use crate::controller::{Controller, Outcome};
use crate::directive;
use crate::exit_codes;
use crate::output::{Renderer, StdoutRenderer};
use crate::provider::{Corrector, Provider};
use crate::retrieval::{LexicalRetriever, Retriever};
use crate::transcript::{Entry, Transcript};

/// Top-level CLI structure for tiller.
#[derive(Parser, Debug)]
#[command(
    name = "tiller",
    version,
    about = "An approval-gated coding agent for the terminal"
)]
pub struct Cli {
    /// The task to perform
    #[arg(required = true)]
    pub task: Vec<String>,

    /// Reasoning provider (google, openai, openrouter, anthropic, ollama)
    #[arg(long, visible_alias = "api")]
    pub provider: Option<String>,

    /// Reasoning model, or provider/model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Corrector provider, or "none" to disable JSON correction
    #[arg(long, visible_alias = "corrector-api")]
    pub corrector: Option<String>,

    /// Corrector model
    #[arg(long)]
    pub corrector_model: Option<String>,

    /// Project root all file paths and commands are confined to
    #[arg(long, visible_alias = "codebase-dir", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Maximum number of turns [default: 20]
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Transcript file to append to
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider.clone(),
            model: self.model.clone(),
            corrector: self.corrector.clone(),
            corrector_model: self.corrector_model.clone(),
            max_turns: self.max_turns,
            log_file: self.log_file.clone(),
        }
    }
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Everything resolved before the first turn.
struct Prepared {
    settings: Settings,
    reasoner: Provider,
    corrector: Option<Provider>,
    retriever: Arc<dyn Retriever>,
    registry: CapabilityRegistry,
    confirmer: TerminalConfirmer,
}

fn prepare(cli: &Cli) -> Result<Prepared> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Could not determine the current directory")?,
    };
    let config = Config::load(&root)?;
    let settings = Settings::resolve(&config, &root, &cli.overrides())?;

    let reasoner = Provider::reasoner(&config, &settings.reasoner)?;
    let corrector = settings
        .corrector
        .as_ref()
        .map(|selection| Provider::corrector(&config, selection))
        .transpose()?;

    let retriever: Arc<dyn Retriever> = Arc::new(LexicalRetriever::new(
        settings.root.clone(),
        &settings.retrieval_include,
        settings.retrieval_max_file_bytes,
    )?);
    let registry = CapabilityRegistry::with_builtins(&settings.root, retriever.clone())?
        .with_command_timeout(settings.command_timeout)
        .with_search_results(settings.search_results);
    let confirmer = TerminalConfirmer::new().context("Failed to initialize the terminal prompt")?;

    Ok(Prepared {
        settings,
        reasoner,
        corrector,
        retriever,
        registry,
        confirmer,
    })
}

/// Runs one task and returns the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let mut renderer = StdoutRenderer::new();
    let task = cli.task.join(" ");

    let prepared = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "configuration failed");
            renderer.error(&format!("{:#}", e));
            return exit_codes::CONFIG;
        }
    };
    let Prepared {
        settings,
        reasoner,
        corrector,
        retriever,
        registry,
        confirmer,
    } = prepared;

    let mut transcript = match Transcript::open(&settings.log_file) {
        Ok(transcript) => transcript,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "transcript unavailable");
            renderer.warning(&format!("{:#}. Continuing without a transcript.", e));
            Transcript::discard()
        }
    };
    tracing::info!(run_id = transcript.run_id(), log = %settings.log_file.display(), "transcript opened");
    transcript.record(Entry::Session, &settings.describe());

    let rules = match directive::load_rules(&settings.root) {
        Ok(Some(rules)) => {
            renderer.status(&format!("Loaded project rules from {}", rules.path.display()));
            Some(rules.content)
        }
        Ok(None) => None,
        Err(e) => {
            renderer.warning(&format!("{:#}. Continuing without project rules.", e));
            None
        }
    };
    let directive_text = directive::system_directive(&settings.root, rules.as_deref());

    let gate = ApprovalGate::new(
        settings.permissions.clone(),
        registry.guard().clone(),
        Box::new(confirmer),
    );
    let corrector = corrector.map(|c| Box::new(c) as Box<dyn Corrector>);

    let mut controller = Controller::new(
        Box::new(reasoner),
        gate,
        Box::new(registry),
        retriever,
        Box::new(renderer),
        transcript,
    )
    .with_corrector(corrector)
    .with_max_turns(settings.max_turns)
    .with_search_results(settings.search_results);

    let outcome = controller.run(&task, directive_text).await;
    tracing::debug!(turns = controller.history().len(), ?outcome, "run finished");
    match outcome {
        Outcome::Done { .. } | Outcome::BudgetExhausted | Outcome::Cancelled => exit_codes::OK,
        Outcome::Fatal { .. } => exit_codes::FATAL,
    }
}
