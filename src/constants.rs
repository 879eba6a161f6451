//! Centralized constants for tiller.
//!
//! All magic numbers, default strings, and fixed loop messages live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "tiller";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "tiller.toml";

/// Transcript log filename under the data directory.
pub const TRANSCRIPT_FILENAME: &str = "transcript.log";

/// Project rules file embedded into the directive when present (matched case-insensitively).
pub const RULES_FILENAME: &str = "RULES.md";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "google";

/// Default reasoning model for Google Gemini.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

/// Default corrector model for Google Gemini.
pub const DEFAULT_GEMINI_CORRECTOR_MODEL: &str = "gemini-2.5-flash";

/// Default reasoning model for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default corrector model for OpenAI.
pub const DEFAULT_OPENAI_CORRECTOR_MODEL: &str = "gpt-4.1-mini";

/// Default reasoning model for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.5-flash";

/// Default corrector model for OpenRouter.
pub const DEFAULT_OPENROUTER_CORRECTOR_MODEL: &str = "google/gemini-2.5-flash";

/// Default reasoning model for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";

/// Default corrector model for Anthropic.
pub const DEFAULT_ANTHROPIC_CORRECTOR_MODEL: &str = "claude-haiku-4-5";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model identifier for Ollama (used for both roles).
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 4096;

/// Sampling temperature for the reasoning model.
pub const REASONING_TEMPERATURE: f64 = 0.7;

/// Sampling temperature for the corrector model.
pub const CORRECTOR_TEMPERATURE: f64 = 0.0;

/// Preamble given to the corrector model.
pub const CORRECTOR_PREAMBLE: &str =
    "You are a JSON correction utility. You will receive a potentially malformed JSON string \
and your only task is to return a valid JSON object. Do not include any text before or after \
the JSON object, and do not use markdown code blocks.";

// --- Loop defaults ---

/// Default turn budget.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Number of snippets returned by the retrieval collaborator.
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Reserved name of the terminal action.
pub const FINISH_ACTION: &str = "finish";

/// User turn appended after malformed output when no corrector is configured.
pub const MALFORMED_NOTICE: &str =
    "Your previous response was not valid JSON. Please correct your JSON formatting.";

/// User turn appended after the corrector also failed to produce valid output.
pub const CORRECTION_FAILED_NOTICE: &str =
    "Your previous response was not valid JSON, and the correction attempt failed. \
Please try again with valid JSON.";

/// User turn appended after the user rejected an action.
pub const REJECTION_NOTICE: &str = "That action was rejected. Please think of a different approach.";

/// User turn appended when configuration denies a capability.
pub const DENIED_NOTICE: &str =
    "That capability is disabled by configuration. Please think of a different approach.";

// --- Capability limits ---

/// Wall-clock ceiling for `run_command`.
pub const COMMAND_TIMEOUT_SECS: u64 = 120;

/// Maximum captured command output in bytes before truncation.
pub const COMMAND_MAX_OUTPUT_SIZE: usize = 50 * 1024;

/// Environment variables removed from child processes.
pub const COMMAND_STRIPPED_ENV_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "ANTHROPIC_API_KEY",
];

/// Maximum file size (bytes) read_file will return.
pub const READ_FILE_MAX_SIZE: u64 = 100 * 1024;

/// Byte threshold for binary file detection (check first N bytes for null).
pub const BINARY_DETECTION_BYTES: usize = 8192;

// --- Retrieval ---

/// Target chunk size in characters.
pub const CHUNK_SIZE: usize = 1000;

/// Characters of overlap carried between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 100;

/// Files larger than this are not indexed.
pub const RETRIEVAL_MAX_FILE_BYTES: u64 = 256 * 1024;

/// File patterns indexed when the config names none.
pub const RETRIEVAL_DEFAULT_INCLUDE: &[&str] = &[
    "*.rs", "*.go", "*.py", "*.js", "*.ts", "*.tsx", "*.java", "*.c", "*.h", "*.cpp", "*.rb",
    "*.toml", "*.yaml", "*.yml", "*.json", "*.md",
];

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

// --- Preview ---

/// Longest argument value shown verbatim in an approval preview.
pub const PREVIEW_ARG_MAX_CHARS: usize = 200;

/// Context lines around each diff hunk.
pub const DIFF_CONTEXT_LINES: usize = 3;
