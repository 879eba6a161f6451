use super::*;
use crate::approval::{Confirm, Decision};
use crate::capability::{CapabilityRegistry, PathGuard};
use crate::permissions::{Permission, PermissionConfig, PermissionPolicy};
use crate::response::Action;
use crate::turn::Role;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

struct ScriptedReasoner {
    replies: Mutex<VecDeque<Result<String>>>,
    seen: Arc<Mutex<Vec<Vec<Turn>>>>,
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("script exhausted")))
    }
}

/// Keeps the outermost `{...}` of whatever it is given.
struct EchoAndFix {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Corrector for EchoAndFix {
    async fn correct(&self, raw: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if start < end => Ok(raw[start..=end].to_string()),
            _ => Ok(raw.to_string()),
        }
    }
}

struct BrokenCorrector;

#[async_trait]
impl Corrector for BrokenCorrector {
    async fn correct(&self, _raw: &str) -> Result<String> {
        Ok("still { not json".into())
    }
}

struct UnreachableCorrector;

#[async_trait]
impl Corrector for UnreachableCorrector {
    async fn correct(&self, _raw: &str) -> Result<String> {
        Err(anyhow!("connection refused"))
    }
}

struct CountingDispatcher {
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Dispatch for CountingDispatcher {
    async fn dispatch(&self, action: &Action) -> String {
        self.calls.lock().unwrap().push(action.name.clone());
        format!("ok: {}", action.name)
    }
}

struct ScriptedConfirmer {
    answers: VecDeque<Decision>,
    prompts: Arc<AtomicUsize>,
}

impl Confirm for ScriptedConfirmer {
    fn confirm(&mut self, _prompt: &str) -> Decision {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answers.pop_front().unwrap_or(Decision::Rejected)
    }
}

struct RecordingRenderer {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingRenderer {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Renderer for RecordingRenderer {
    fn turn_start(&mut self, turn: usize, max_turns: usize) {
        self.push(format!("turn {}/{}", turn, max_turns));
    }
    fn status(&mut self, msg: &str) {
        self.push(format!("status {}", msg));
    }
    fn initial_context(&mut self, text: &str) {
        self.push(format!("context {}", text));
    }
    fn thought(&mut self, text: &str) {
        self.push(format!("thought {}", text));
    }
    fn action(&mut self, name: &str, _args: &str) {
        self.push(format!("action {}", name));
    }
    fn preview(&mut self, title: &str, _body: &str) {
        self.push(format!("preview {}", title));
    }
    fn observation(&mut self, text: &str) {
        self.push(format!("observation {}", text));
    }
    fn warning(&mut self, msg: &str) {
        self.push(format!("warning {}", msg));
    }
    fn error(&mut self, msg: &str) {
        self.push(format!("error {}", msg));
    }
    fn finished(&mut self, summary: &str) {
        self.push(format!("finished {}", summary));
    }
}

struct StaticRetriever;

impl Retriever for StaticRetriever {
    fn search(&self, query: &str, _k: usize) -> Result<String> {
        Ok(format!("snippets for {}", query))
    }
}

struct FailingRetriever;

impl Retriever for FailingRetriever {
    fn search(&self, _query: &str, _k: usize) -> Result<String> {
        Err(anyhow!("index missing"))
    }
}

/// Observation points shared with the doubles inside a controller.
#[derive(Default)]
struct Probes {
    seen: Arc<Mutex<Vec<Vec<Turn>>>>,
    dispatched: Arc<Mutex<Vec<String>>>,
    prompts: Arc<AtomicUsize>,
    events: Arc<Mutex<Vec<String>>>,
}

impl Probes {
    fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

fn project(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tiller_ctl_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn reply(name: &str, args: Value) -> Result<String> {
    Ok(json!({"thought": format!("use {}", name), "action": {"name": name, "args": args}}).to_string())
}

fn finish() -> Result<String> {
    reply("finish", json!({"final_summary": "all done"}))
}

struct Harness {
    dir: PathBuf,
    replies: Vec<Result<String>>,
    answers: Vec<Decision>,
    policy: PermissionPolicy,
    dispatcher: Option<Box<dyn Dispatch>>,
    retriever: Arc<dyn Retriever>,
    transcript: Option<Transcript>,
}

impl Harness {
    fn new(dir: &Path, replies: Vec<Result<String>>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            replies,
            answers: Vec::new(),
            policy: PermissionPolicy::default(),
            dispatcher: None,
            retriever: Arc::new(StaticRetriever),
            transcript: None,
        }
    }

    fn answers(mut self, answers: &[Decision]) -> Self {
        self.answers = answers.to_vec();
        self
    }

    fn build(self, probes: &Probes) -> Controller {
        let reasoner = ScriptedReasoner {
            replies: Mutex::new(self.replies.into_iter().collect()),
            seen: probes.seen.clone(),
        };
        let gate = ApprovalGate::new(
            self.policy,
            PathGuard::new(&self.dir).unwrap(),
            Box::new(ScriptedConfirmer {
                answers: self.answers.into_iter().collect(),
                prompts: probes.prompts.clone(),
            }),
        );
        let dispatcher = self.dispatcher.unwrap_or_else(|| {
            Box::new(CountingDispatcher {
                calls: probes.dispatched.clone(),
            })
        });
        Controller::new(
            Box::new(reasoner),
            gate,
            dispatcher,
            self.retriever,
            Box::new(RecordingRenderer {
                events: probes.events.clone(),
            }),
            self.transcript.unwrap_or_else(Transcript::discard),
        )
    }
}

fn assert_prefix(shorter: &[Turn], longer: &[Turn]) {
    assert!(shorter.len() < longer.len());
    assert_eq!(shorter, &longer[..shorter.len()]);
}

#[tokio::test]
async fn test_finish_skips_gate_and_dispatch() {
    let dir = project("finish");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![finish()]).build(&probes);

    let outcome = controller.run("tidy up", "DIRECTIVE".into()).await;

    assert_eq!(outcome, Outcome::Done { summary: "all done".into() });
    assert_eq!(probes.prompts(), 0);
    assert!(probes.dispatched().is_empty());
    let turns = controller.history().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role(), Role::Model);
    assert!(probes
        .events
        .lock()
        .unwrap()
        .contains(&"finished all done".to_string()));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_seed_turn_holds_directive_task_and_search() {
    let dir = project("seed");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![finish()]).build(&probes);
    controller.run("add logging", "DIRECTIVE".into()).await;

    let seed = &probes.seen.lock().unwrap()[0][0];
    assert_eq!(seed.role(), Role::User);
    assert_eq!(seed.parts()[0], "DIRECTIVE");
    assert!(seed.parts()[1].contains("Here is the task: add logging"));
    assert!(seed.parts()[1].contains("snippets for add logging"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_initial_search_failure_degrades_to_text() {
    let dir = project("search_fail");
    let probes = Probes::default();
    let mut harness = Harness::new(&dir, vec![finish()]);
    harness.retriever = Arc::new(FailingRetriever);
    let mut controller = harness.build(&probes);

    let outcome = controller.run("task", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    let seed = &controller.history().turns()[0];
    assert!(seed.parts()[1].contains("The initial search failed (index missing)"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_approved_action_dispatches_and_appends_observation() {
    let dir = project("approved");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![reply("read_file", json!({"path": "a.txt"})), finish()])
        .answers(&[Decision::Approved])
        .build(&probes);

    let outcome = controller.run("read it", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert_eq!(probes.dispatched(), vec!["read_file"]);
    assert_eq!(probes.prompts(), 1);
    let turns = controller.history().turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[1].role(), Role::Model);
    assert!(turns[1].text().contains("\"read_file\""));
    assert_eq!(turns[2].role(), Role::User);
    assert_eq!(turns[2].text(), "ok: read_file");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_history_only_grows_between_generations() {
    let dir = project("prefix");
    let probes = Probes::default();
    let mut controller = Harness::new(
        &dir,
        vec![
            reply("list_directory", json!({"path": "."})),
            Ok("garbage".into()),
            reply("write_file", json!({"path": "a", "content": "b"})),
            reply("search", json!({"query": "x"})),
            finish(),
        ],
    )
    .answers(&[Decision::Approved, Decision::Rejected, Decision::Approved])
    .build(&probes);

    controller.run("t", "D".into()).await;

    let seen = probes.seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    for pair in seen.windows(2) {
        assert_prefix(&pair[0], &pair[1]);
    }
    assert_prefix(&seen[4], controller.history().turns());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_budget_exhausted_without_final_dispatch() {
    let dir = project("budget");
    let probes = Probes::default();
    let replies = (0..4)
        .map(|i| reply("read_file", json!({"path": format!("f{}.txt", i)})))
        .collect();
    let mut controller = Harness::new(&dir, replies)
        .answers(&[Decision::Approved; 4])
        .build(&probes)
        .with_max_turns(3);

    let outcome = controller.run("loop forever", "D".into()).await;

    assert_eq!(outcome, Outcome::BudgetExhausted);
    assert_eq!(probes.dispatched().len(), 3);
    assert_eq!(probes.seen.lock().unwrap().len(), 3);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_zero_budget_never_generates() {
    let dir = project("zero_budget");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![finish()])
        .build(&probes)
        .with_max_turns(0);

    assert_eq!(controller.run("t", "D".into()).await, Outcome::BudgetExhausted);
    assert!(probes.seen.lock().unwrap().is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_malformed_without_corrector_dispatches_nothing() {
    let dir = project("malformed");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![Ok("I think I should read a file".into()), finish()])
        .build(&probes);

    let outcome = controller.run("t", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert!(probes.dispatched().is_empty());
    assert_eq!(probes.prompts(), 0);
    let turns = controller.history().turns();
    assert_eq!(turns[1].text(), "I think I should read a file");
    assert_eq!(turns[2].text(), MALFORMED_NOTICE);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_malformed_turns_consume_budget() {
    let dir = project("malformed_budget");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![Ok("nope".into()), Ok("nope again".into()), finish()])
        .build(&probes)
        .with_max_turns(2);

    assert_eq!(controller.run("t", "D".into()).await, Outcome::BudgetExhausted);
    assert!(probes.dispatched().is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_corrector_round_trip_yields_valid_action() {
    let dir = project("corrector");
    let probes = Probes::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let wrapped = format!(
        "Sure! Here is my answer: {} Let me know.",
        reply("read_file", json!({"path": "src/main.rs"})).unwrap()
    );
    let mut controller = Harness::new(&dir, vec![Ok(wrapped), finish()])
        .answers(&[Decision::Approved])
        .build(&probes)
        .with_corrector(Some(Box::new(EchoAndFix { calls: calls.clone() })));

    let outcome = controller.run("t", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(probes.dispatched(), vec!["read_file"]);
    let recorded = response::parse(&controller.history().turns()[1].text()).unwrap();
    assert_eq!(recorded.action.str_arg("path"), Some("src/main.rs"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_failed_correction_asks_model_again() {
    let dir = project("correction_failed");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![Ok("{broken".into()), finish()])
        .build(&probes)
        .with_corrector(Some(Box::new(BrokenCorrector)));

    let outcome = controller.run("t", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert!(probes.dispatched().is_empty());
    let turns = controller.history().turns();
    assert_eq!(turns[1].text(), "still { not json");
    assert_eq!(turns[2].text(), CORRECTION_FAILED_NOTICE);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_corrector_call_failure_is_fatal() {
    let dir = project("corrector_fatal");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![Ok("{broken".into())])
        .build(&probes)
        .with_corrector(Some(Box::new(UnreachableCorrector)));

    match controller.run("t", "D".into()).await {
        Outcome::Fatal { cause } => {
            assert!(cause.starts_with("Corrector call failed"));
            assert!(cause.contains("connection refused"));
        }
        other => panic!("expected fatal, got {:?}", other),
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_generation_failure_is_fatal() {
    let dir = project("generate_fatal");
    let probes = Probes::default();
    let mut controller = Harness::new(&dir, vec![Err(anyhow!("503 Service Unavailable"))]).build(&probes);

    match controller.run("t", "D".into()).await {
        Outcome::Fatal { cause } => assert!(cause.contains("503 Service Unavailable")),
        other => panic!("expected fatal, got {:?}", other),
    }
    assert!(probes
        .events
        .lock()
        .unwrap()
        .iter()
        .any(|e| e.starts_with("error Reasoning call failed")));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_interrupt_during_approval_cancels() {
    let dir = project("interrupt");
    let probes = Probes::default();
    let mut controller = Harness::new(
        &dir,
        vec![reply("run_command", json!({"command": "rm -rf build"})), finish()],
    )
    .answers(&[Decision::Interrupted])
    .build(&probes);

    assert_eq!(controller.run("t", "D".into()).await, Outcome::Cancelled);
    assert!(probes.dispatched().is_empty());
    assert_eq!(probes.seen.lock().unwrap().len(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_rejected_write_leaves_file_unchanged() {
    let dir = project("rejected_write");
    std::fs::write(dir.join("a.txt"), "original\n").unwrap();
    let probes = Probes::default();
    let mut harness = Harness::new(
        &dir,
        vec![reply("write_file", json!({"path": "a.txt", "content": "changed\n"})), finish()],
    )
    .answers(&[Decision::Rejected]);
    let retriever: Arc<dyn Retriever> = Arc::new(StaticRetriever);
    harness.dispatcher = Some(Box::new(CapabilityRegistry::with_builtins(&dir, retriever).unwrap()));
    let mut controller = harness.build(&probes);

    let outcome = controller.run("t", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "original\n");
    let turns = controller.history().turns();
    assert!(turns[1].text().contains("changed"));
    assert_eq!(turns[2].text(), REJECTION_NOTICE);
    assert!(probes
        .events
        .lock()
        .unwrap()
        .contains(&"preview Proposed changes for a.txt".to_string()));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_denied_capability_is_never_prompted_or_dispatched() {
    let dir = project("denied");
    let probes = Probes::default();
    let mut config = PermissionConfig::default();
    config
        .capabilities
        .insert("run_command".into(), Permission::Deny);
    let mut harness = Harness::new(&dir, vec![reply("run_command", json!({"command": "make"})), finish()]);
    harness.policy = PermissionPolicy::from_config(&config);
    let mut controller = harness.build(&probes);

    let outcome = controller.run("t", "D".into()).await;

    assert!(matches!(outcome, Outcome::Done { .. }));
    assert_eq!(probes.prompts(), 0);
    assert!(probes.dispatched().is_empty());
    assert_eq!(controller.history().turns()[2].text(), DENIED_NOTICE);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_path_escape_becomes_observation() {
    let dir = project("escape");
    let probes = Probes::default();
    let mut harness = Harness::new(
        &dir,
        vec![reply("read_file", json!({"path": "../../etc/passwd"})), finish()],
    )
    .answers(&[Decision::Approved]);
    let retriever: Arc<dyn Retriever> = Arc::new(StaticRetriever);
    harness.dispatcher = Some(Box::new(CapabilityRegistry::with_builtins(&dir, retriever).unwrap()));
    let mut controller = harness.build(&probes);

    controller.run("t", "D".into()).await;

    let observation = controller.history().turns()[2].text();
    assert!(observation.starts_with("Error: Access denied."), "{}", observation);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_transcript_records_each_step() {
    let dir = project("transcript");
    let log = dir.join("logs").join("run.log");
    let probes = Probes::default();
    let mut harness = Harness::new(&dir, vec![Ok("bad".into()), reply("search", json!({"query": "q"})), finish()])
        .answers(&[Decision::Approved]);
    harness.transcript = Some(Transcript::open(&log).unwrap());
    let mut controller = harness.build(&probes);

    controller.run("find things", "D".into()).await;
    drop(controller);

    let text = std::fs::read_to_string(&log).unwrap();
    for label in [
        "SESSION: task: find things",
        "MALFORMED: ",
        "THOUGHT: use search",
        "ACTION: search {\"query\":\"q\"}",
        "OBSERVATION: ok: search",
        "FINISH: all done",
    ] {
        assert!(text.contains(label), "missing {:?} in\n{}", label, text);
    }
    std::fs::remove_dir_all(&dir).unwrap();
}
