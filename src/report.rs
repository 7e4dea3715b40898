//! Per-file outcomes and the end-of-run summary.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::diff::DiffSummary;
use crate::driver::MatchRecord;

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// At least one fixer matched.
    Matched,
    /// No fixer matched; the file was not touched.
    Unmatched,
    /// Parsing, rewriting or writing failed; the file was not touched.
    Failed(String),
}

/// Result for a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub matches: Vec<MatchRecord>,
    /// True once the new contents are on disk.
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub changes: DiffSummary,
}

impl FileReport {
    pub fn unmatched(path: PathBuf) -> Self {
        Self {
            path,
            status: FileStatus::Unmatched,
            matches: Vec::new(),
            written: false,
            diff: None,
            changes: DiffSummary::default(),
        }
    }

    pub fn failed(path: PathBuf, error: impl fmt::Display) -> Self {
        Self {
            status: FileStatus::Failed(error.to_string()),
            ..Self::unmatched(path)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed(_))
    }

    /// Match counts per fixer, in name order.
    pub fn matches_by_fixer(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.matches {
            *counts.entry(record.fixer.as_str()).or_default() += 1;
        }
        counts
    }
}

/// Totals across a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub matched_files: usize,
    pub unmatched_files: usize,
    pub failed_files: usize,
    pub written_files: usize,
    pub rewrites: usize,
    pub changes: DiffSummary,
}

/// Result of running fixers over a set of files.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub fixers: Vec<String>,
    pub files: Vec<FileReport>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Builds a report, ordering files by path.
    pub fn new(dry_run: bool, fixers: Vec<String>, mut files: Vec<FileReport>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let mut summary = RunSummary {
            total_files: files.len(),
            ..Default::default()
        };
        for file in &files {
            match file.status {
                FileStatus::Matched => summary.matched_files += 1,
                FileStatus::Unmatched => summary.unmatched_files += 1,
                FileStatus::Failed(_) => summary.failed_files += 1,
            }
            if file.written {
                summary.written_files += 1;
            }
            summary.rewrites += file.matches.len();
            summary.changes.merge(&file.changes);
        }
        Self {
            dry_run,
            fixers,
            files,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.failed_files > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_failed())
    }

    /// All per-file diffs, concatenated.
    pub fn diff(&self) -> String {
        self.files
            .iter()
            .filter_map(|f| f.diff.as_deref())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            let path = file.path.display();
            match &file.status {
                FileStatus::Matched => {
                    let counts: Vec<String> = file
                        .matches_by_fixer()
                        .into_iter()
                        .map(|(fixer, n)| format!("{fixer} x{n}"))
                        .collect();
                    let action = if file.written {
                        "fixed"
                    } else if self.dry_run {
                        "would fix"
                    } else {
                        "matched, unchanged"
                    };
                    writeln!(f, "{path}: {action} ({})", counts.join(", "))?;
                }
                FileStatus::Unmatched => writeln!(f, "{path}: no matches")?,
                FileStatus::Failed(error) => writeln!(f, "{path}: error: {error}")?,
            }
        }

        let s = &self.summary;
        write!(
            f,
            "{} file(s): {} matched, {} unmatched, {} failed; {} rewrite(s)",
            s.total_files, s.matched_files, s.unmatched_files, s.failed_files, s.rewrites
        )?;
        if s.changes.files_changed > 0 {
            write!(f, "\n{}", s.changes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Location;

    fn record(fixer: &str) -> MatchRecord {
        MatchRecord {
            fixer: fixer.to_string(),
            rule: fixer.to_string(),
            location: Location::new(1, 5),
            matched: "opts".to_string(),
        }
    }

    fn matched(path: &str, written: bool) -> FileReport {
        FileReport {
            status: FileStatus::Matched,
            matches: vec![record("replace_opts"), record("replace_opts"), record("options_object")],
            written,
            diff: Some(format!("--- a/{path}\n+++ b/{path}\n")),
            changes: DiffSummary {
                files_changed: 1,
                insertions: 1,
                deletions: 1,
            },
            ..FileReport::unmatched(PathBuf::from(path))
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = RunReport::new(
            true,
            vec!["replace_opts".to_string()],
            vec![
                matched("b.py", false),
                FileReport::unmatched(PathBuf::from("a.py")),
                FileReport::failed(PathBuf::from("c.py"), "Parse error at 3:1: '(' was never closed"),
            ],
        );
        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.summary.matched_files, 1);
        assert_eq!(report.summary.failed_files, 1);
        assert_eq!(report.summary.rewrites, 3);
        assert!(report.has_errors());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.files[0].path, PathBuf::from("a.py"));
    }

    #[test]
    fn test_display() {
        let report = RunReport::new(
            true,
            Vec::new(),
            vec![
                matched("b.py", false),
                FileReport::unmatched(PathBuf::from("a.py")),
                FileReport::failed(PathBuf::from("c.py"), "boom"),
            ],
        );
        let text = report.to_string();
        assert!(text.contains("a.py: no matches\n"));
        assert!(text.contains("b.py: would fix (options_object x1, replace_opts x2)\n"));
        assert!(text.contains("c.py: error: boom\n"));
        assert!(text.contains("3 file(s): 1 matched, 1 unmatched, 1 failed; 3 rewrite(s)"));
        assert!(text.ends_with("1 file(s) changed, 1 insertions(+), 1 deletions(-)"));
    }

    #[test]
    fn test_json() {
        let report = RunReport::new(
            false,
            vec!["replace_opts".to_string()],
            vec![matched("b.py", true), FileReport::failed(PathBuf::from("c.py"), "boom")],
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["files"][0]["status"], "matched");
        assert_eq!(json["files"][0]["matches"][0]["location"]["line"], 1);
        assert_eq!(json["files"][1]["status"]["failed"], "boom");
        assert_eq!(json["summary"]["written_files"], 1);
        assert!(!report.diff().is_empty());
    }
}
