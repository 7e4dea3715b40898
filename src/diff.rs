//! Unified diffs for previewing fixes.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

const CONTEXT_LINES: usize = 3;

/// Generates a unified diff with `@@` hunk headers, or `""` if equal.
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    if original == modified {
        return String::new();
    }
    let diff = TextDiff::from_lines(original, modified);
    let name = path.display().to_string();
    let mut output = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .missing_newline_hint(true)
        .to_string();
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Colorizes the lines of a unified diff for terminal display.
pub fn colorize(unified: &str) -> String {
    const RED: &str = "\x1b[31m";
    const GREEN: &str = "\x1b[32m";
    const CYAN: &str = "\x1b[36m";
    const RESET: &str = "\x1b[0m";

    let mut output = String::with_capacity(unified.len());
    for line in unified.split_inclusive('\n') {
        let color = if line.starts_with("---") || line.starts_with("+++") || line.starts_with("@@")
        {
            CYAN
        } else if line.starts_with('-') {
            RED
        } else if line.starts_with('+') {
            GREEN
        } else {
            ""
        };
        if color.is_empty() {
            output.push_str(line);
        } else {
            let body = line.trim_end_matches('\n');
            let _ = write!(output, "{color}{body}{RESET}");
            if line.ends_with('\n') {
                output.push('\n');
            }
        }
    }
    output
}

/// Line counts across the changed files of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    pub fn from_diff(original: &str, modified: &str) -> Self {
        let diff = TextDiff::from_lines(original, modified);
        let mut summary = Self::default();

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => summary.insertions += 1,
                ChangeTag::Delete => summary.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        if summary.insertions > 0 || summary.deletions > 0 {
            summary.files_changed = 1;
        }
        summary
    }

    pub fn merge(&mut self, other: &DiffSummary) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.insertions, self.deletions
        )
    }
}
