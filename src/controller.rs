//! The reason/act/observe loop.
//!
//! [`Controller::run`] seeds the history with the directive, the task and one
//! upfront search, then repeats: generate, parse (recovering from malformed
//! output), approve, dispatch, append the observation. Every exit is one of
//! the four [`Outcome`]s; loop conditions never surface as `Err`.
//!
//! Each iteration consumes one turn of the budget, whether it ends in a
//! dispatch, a rejection or a recovery. At most one action is dispatched per
//! turn.

use std::sync::Arc;

use crate::approval::{ApprovalGate, Verdict};
use crate::capability::Dispatch;
use crate::constants::{
    CORRECTION_FAILED_NOTICE, DEFAULT_MAX_TURNS, DEFAULT_SEARCH_RESULTS, DENIED_NOTICE,
    MALFORMED_NOTICE, REJECTION_NOTICE,
};
use crate::directive;
use crate::output::Renderer;
use crate::provider::{Corrector, Reasoner};
use crate::response::{self, ParseFailure, StructuredResponse};
use crate::retrieval::Retriever;
use crate::transcript::{Entry, Transcript};
use crate::turn::{History, Turn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model called `finish`.
    Done { summary: String },
    /// The user interrupted the approval prompt.
    Cancelled,
    /// The turn budget ran out.
    BudgetExhausted,
    /// A reasoning or corrector call failed.
    Fatal { cause: String },
}

/// Result of the recovery protocol for one malformed response.
enum Recovery {
    Parsed(StructuredResponse),
    /// History updated; go back to generating.
    Retry,
    Fatal(Outcome),
}

pub struct Controller {
    reasoner: Box<dyn Reasoner>,
    corrector: Option<Box<dyn Corrector>>,
    gate: ApprovalGate,
    dispatcher: Box<dyn Dispatch>,
    retriever: Arc<dyn Retriever>,
    renderer: Box<dyn Renderer>,
    transcript: Transcript,
    max_turns: usize,
    search_results: usize,
    history: History,
}

impl Controller {
    pub fn new(
        reasoner: Box<dyn Reasoner>,
        gate: ApprovalGate,
        dispatcher: Box<dyn Dispatch>,
        retriever: Arc<dyn Retriever>,
        renderer: Box<dyn Renderer>,
        transcript: Transcript,
    ) -> Self {
        Self {
            reasoner,
            corrector: None,
            gate,
            dispatcher,
            retriever,
            renderer,
            transcript,
            max_turns: DEFAULT_MAX_TURNS,
            search_results: DEFAULT_SEARCH_RESULTS,
            history: History::new(),
        }
    }

    pub fn with_corrector(mut self, corrector: Option<Box<dyn Corrector>>) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_search_results(mut self, k: usize) -> Self {
        self.search_results = k;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Runs the loop to completion for `task`.
    pub async fn run(&mut self, task: &str, directive_text: String) -> Outcome {
        self.transcript.record(Entry::Session, &format!("task: {}", task));
        self.seed(task, directive_text);

        let mut turns_taken = 0;
        loop {
            if turns_taken >= self.max_turns {
                self.transcript
                    .record(Entry::BudgetExhausted, &format!("{} turns used", turns_taken));
                self.renderer.warning(&format!(
                    "Reached the maximum of {} turns without finishing.",
                    self.max_turns
                ));
                return Outcome::BudgetExhausted;
            }
            turns_taken += 1;
            self.renderer.turn_start(turns_taken, self.max_turns);
            self.renderer.status("Generating thought and action...");

            let generated = self.reasoner.generate(self.history.turns()).await;
            let raw = match generated {
                Ok(raw) => raw,
                Err(e) => return self.fatal("Reasoning call failed", e),
            };

            let response = match response::parse(&raw) {
                Ok(response) => response,
                Err(failure) => match self.recover(failure).await {
                    Recovery::Parsed(response) => response,
                    Recovery::Retry => continue,
                    Recovery::Fatal(outcome) => return outcome,
                },
            };

            let action = &response.action;
            self.transcript.record(Entry::Thought, &response.thought);
            self.transcript
                .record(Entry::Action, &format!("{} {}", action.name, action.args_json()));
            self.renderer.thought(&response.thought);
            self.renderer.action(&action.name, &action.args_json());

            if action.is_finish() {
                let summary = action
                    .str_arg("final_summary")
                    .or_else(|| action.str_arg("summary"))
                    .unwrap_or("No summary provided.")
                    .to_string();
                self.history.push(Turn::model(response.to_turn_text()));
                self.transcript.record(Entry::Finish, &summary);
                self.renderer.finished(&summary);
                return Outcome::Done { summary };
            }

            match self.gate.request_approval(action, self.renderer.as_mut()) {
                Verdict::Approved => {}
                Verdict::Rejected => {
                    self.transcript.record(Entry::Rejected, &action.name);
                    self.renderer
                        .warning("Action rejected. The agent will reconsider.");
                    self.record_refusal(&response, REJECTION_NOTICE);
                    continue;
                }
                Verdict::Denied => {
                    self.transcript.record(Entry::Denied, &action.name);
                    self.renderer.warning(&format!(
                        "'{}' is disabled by configuration. The agent will reconsider.",
                        action.name
                    ));
                    self.record_refusal(&response, DENIED_NOTICE);
                    continue;
                }
                Verdict::Interrupted => {
                    self.transcript
                        .record(Entry::Cancelled, "approval prompt interrupted");
                    self.renderer.warning("Operation cancelled by user.");
                    return Outcome::Cancelled;
                }
            }

            let observation = self.dispatcher.dispatch(action).await;
            self.transcript.record(Entry::Observation, &observation);
            self.renderer.observation(&observation);

            self.history.push(Turn::model(response.to_turn_text()));
            self.history.push(Turn::user(observation));
        }
    }

    /// Appends the seed turn: directive, task and the upfront search.
    fn seed(&mut self, task: &str, directive_text: String) {
        self.renderer
            .status("Performing initial codebase search to get context...");
        let initial = match self.retriever.search(task, self.search_results) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "initial search failed");
                self.renderer.warning(&format!("Initial search failed: {}", e));
                format!(
                    "The initial search failed ({}). Use the search capability to look for relevant code.",
                    e
                )
            }
        };
        self.renderer.initial_context(&initial);
        self.history
            .push(directive::seed_turn(directive_text, task, &initial));
    }

    async fn recover(&mut self, failure: ParseFailure) -> Recovery {
        tracing::warn!(reason = %failure.reason, "malformed model response");
        self.transcript
            .record(Entry::Malformed, &format!("{}: {}", failure.reason, failure.raw));

        let Some(corrector) = &self.corrector else {
            self.renderer
                .warning("Malformed response and no corrector configured. Asking the model to retry.");
            self.history.push(Turn::model(failure.raw));
            self.history.push(Turn::user(MALFORMED_NOTICE));
            return Recovery::Retry;
        };

        self.renderer
            .warning("Malformed response detected. Attempting to correct...");
        let result = corrector.correct(&failure.raw).await;
        let corrected = match result {
            Ok(text) => text,
            Err(e) => return Recovery::Fatal(self.fatal("Corrector call failed", e)),
        };

        match response::parse(&corrected) {
            Ok(response) => {
                self.transcript.record(Entry::Corrected, &corrected);
                self.renderer.status("Response corrected successfully.");
                Recovery::Parsed(response)
            }
            Err(second) => {
                tracing::warn!(reason = %second.reason, "corrected response still malformed");
                self.transcript.record(
                    Entry::Malformed,
                    &format!("after correction, {}: {}", second.reason, second.raw),
                );
                self.renderer
                    .warning("Failed to correct the response. Asking the model to retry.");
                self.history.push(Turn::model(second.raw));
                self.history.push(Turn::user(CORRECTION_FAILED_NOTICE));
                Recovery::Retry
            }
        }
    }

    /// Records a proposed action that was not dispatched.
    fn record_refusal(&mut self, response: &StructuredResponse, notice: &str) {
        self.history.push(Turn::model(response.to_turn_text()));
        self.history.push(Turn::user(notice));
    }

    fn fatal(&mut self, context: &str, error: anyhow::Error) -> Outcome {
        let cause = format!("{}: {:#}", context, error);
        tracing::error!(%cause, "run aborted");
        self.transcript.record(Entry::Fatal, &cause);
        self.renderer.error(&cause);
        Outcome::Fatal { cause }
    }
}

#[cfg(test)]
mod tests;
