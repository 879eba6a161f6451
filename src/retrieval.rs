//! Retrieval collaborator used to seed the first turn and back `search`.
//!
//! [`Retriever`] is the seam; [`LexicalRetriever`] is the built-in
//! implementation. It walks the project on every query, splits each
//! included file into overlapping line windows, and ranks windows by how often
//! the query's terms occur in them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{BINARY_DETECTION_BYTES, CHUNK_OVERLAP, CHUNK_SIZE, SKIPPED_DIRS};

/// `search(query, k) → formatted_text`.
pub trait Retriever: Send + Sync {
    fn search(&self, query: &str, k: usize) -> Result<String>;
}

/// Term-frequency search over the files of one project.
pub struct LexicalRetriever {
    root: PathBuf,
    include: Vec<glob::Pattern>,
    max_file_bytes: u64,
}

struct Snippet {
    source: String,
    index: usize,
    text: String,
    score: usize,
}

impl LexicalRetriever {
    /// # Errors
    ///
    /// Returns an error if an include pattern is not a valid glob.
    pub fn new(root: PathBuf, include: &[String], max_file_bytes: u64) -> Result<Self> {
        let include = include
            .iter()
            .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid include pattern '{}'", p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            root,
            include,
            max_file_bytes,
        })
    }

    fn included(&self, rel: &Path) -> bool {
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.include
            .iter()
            .any(|p| p.matches(&name) || p.matches_path(rel))
    }

    /// Recursively collect included files, skipping hidden and build directories.
    fn collect_files(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
        let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            // symlinks are never followed: they may leave the root or loop
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                    continue;
                }
                if let Err(e) = self.collect_files(&path, files) {
                    tracing::debug!(dir = %path.display(), error = %format!("{:#}", e), "skipping unreadable directory");
                }
            } else if file_type.is_file() {
                let rel = path.strip_prefix(&self.root).unwrap_or(&path);
                if self.included(rel) {
                    files.push(path);
                }
            }
        }
        Ok(())
    }

    fn read_text(&self, path: &Path) -> Option<String> {
        let metadata = fs::metadata(path).ok()?;
        if metadata.len() > self.max_file_bytes {
            return None;
        }
        let bytes = fs::read(path).ok()?;
        let check_len = bytes.len().min(BINARY_DETECTION_BYTES);
        if bytes[..check_len].contains(&0) {
            return None;
        }
        String::from_utf8(bytes).ok()
    }
}

impl Retriever for LexicalRetriever {
    fn search(&self, query: &str, k: usize) -> Result<String> {
        let terms = query_terms(query);
        if terms.is_empty() || k == 0 {
            return Ok(NO_RESULTS.into());
        }

        let mut files = Vec::new();
        self.collect_files(&self.root, &mut files)?;

        let mut snippets = Vec::new();
        for file in &files {
            let Some(content) = self.read_text(file) else {
                continue;
            };
            let source = file
                .strip_prefix(&self.root)
                .unwrap_or(file)
                .to_string_lossy()
                .into_owned();
            for (index, text) in chunk_lines(&content, CHUNK_SIZE, CHUNK_OVERLAP)
                .into_iter()
                .enumerate()
            {
                let score = score(&text, &terms);
                if score > 0 {
                    snippets.push(Snippet {
                        source: source.clone(),
                        index,
                        text,
                        score,
                    });
                }
            }
        }

        snippets.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.index.cmp(&b.index))
        });
        snippets.truncate(k);

        Ok(format_snippets(&snippets))
    }
}

const NO_RESULTS: &str = "No relevant code snippets found in the codebase.";

fn format_snippets(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return NO_RESULTS.into();
    }
    let mut output = String::from("Found the following relevant code snippets:\n\n");
    for (i, snippet) in snippets.iter().enumerate() {
        output.push_str(&format!(
            "--- Snippet {} (from file: {}) ---\n{}\n\n",
            i + 1,
            snippet.source,
            snippet.text
        ));
    }
    output
}

/// Lowercased, deduplicated identifier-like words of at least two characters.
fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

fn score(text: &str, terms: &[String]) -> usize {
    let haystack = text.to_lowercase();
    terms.iter().map(|t| haystack.matches(t.as_str()).count()).sum()
}

/// Splits `content` into windows of roughly `size` characters on line
/// boundaries, each starting with up to `overlap` characters of the previous
/// window's trailing lines.
fn chunk_lines(content: &str, size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;
    // whether `current` holds lines not yet emitted in any chunk
    let mut fresh = false;

    for line in content.lines() {
        current.push(line);
        current_len += line.len() + 1;
        fresh = true;
        if current_len >= size {
            chunks.push(current.join("\n"));
            fresh = false;

            let mut carried: Vec<&str> = Vec::new();
            let mut carried_len = 0;
            for prev in current.iter().rev() {
                if carried_len + prev.len() + 1 > overlap {
                    break;
                }
                carried_len += prev.len() + 1;
                carried.push(*prev);
            }
            carried.reverse();
            current = carried;
            current_len = carried_len;
        }
    }
    if fresh && current.iter().any(|l| !l.trim().is_empty()) {
        chunks.push(current.join("\n"));
    }
    chunks
}
