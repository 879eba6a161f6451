//! Diff generation for file change previews.
//!
//! Provides [`unified_diff`] for comparing existing vs proposed content.
//! Output is plain text; [`crate::output::StdoutRenderer`] colors it by
//! line prefix when showing it to the user.

use similar::{ChangeTag, TextDiff};

use crate::constants::DIFF_CONTEXT_LINES;

/// Generate a unified diff between `old` and `new`.
///
/// `old` is `None` when the file does not exist yet, which yields a
/// `/dev/null` header and all-addition hunks. Returns an empty string when
/// the contents are identical.
pub fn unified_diff(old: Option<&str>, new: &str, path: &str) -> String {
    if old == Some(new) {
        return String::new();
    }
    let diff = TextDiff::from_lines(old.unwrap_or(""), new);

    let mut output = String::new();
    match old {
        Some(_) => output.push_str(&format!("--- a/{}\n", path)),
        None => output.push_str("--- /dev/null\n"),
    }
    output.push_str(&format!("+++ b/{}\n", path));

    for hunk in diff.unified_diff().context_radius(DIFF_CONTEXT_LINES).iter_hunks() {
        output.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            output.push(sign);
            output.push_str(change.value());
            if change.missing_newline() {
                output.push('\n');
            }
        }
    }

    output
}
