//! Discovery of source files to fix.

use crate::error::{FixerError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Files found under the requested paths, and the entries that could not be walked.
#[derive(Debug, Default)]
pub struct Resolved {
    pub files: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, FixerError)>,
}

impl Resolved {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.errors.is_empty()
    }
}

/// Predicates selecting which files under the given paths get fixed.
#[derive(Clone, Debug)]
pub struct FileMatcher {
    extensions: Vec<String>,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
    content_patterns: Vec<String>,
    skip_hidden: bool,
    follow_links: bool,
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            content_patterns: Vec::new(),
            skip_hidden: true,
            follow_links: false,
        }
    }
}

impl FileMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches files with the given extension (without dot).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions
            .push(ext.into().trim_start_matches('.').to_string());
        self
    }

    pub fn extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for ext in exts {
            self = self.extension(ext);
        }
        self
    }

    /// Keeps only files whose path relative to the walked directory matches
    /// one of the include globs. No include globs means everything.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_globs.push(pattern.into());
        self
    }

    /// Excludes files whose path relative to the walked directory matches.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_globs.push(pattern.into());
        self
    }

    /// Only keeps files whose content matches the regex.
    pub fn contains_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.content_patterns.push(pattern.into());
        self
    }

    /// Whether dot-directories like `.git` are descended into.
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Whether symlinks are followed while walking directories.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Resolves files and directories into a sorted, de-duplicated file list.
    ///
    /// Files named explicitly are always kept, directories are walked
    /// recursively and filtered by extension, globs and content. A missing
    /// path is an error; entries that fail while walking are collected in
    /// [`Resolved::errors`] and the walk goes on.
    pub fn resolve(&self, paths: &[PathBuf]) -> Result<Resolved> {
        let filters = Filters::build(self)?;
        let mut found = BTreeSet::new();
        let mut errors = Vec::new();

        for path in paths {
            let metadata = fs::metadata(path)?;
            if metadata.is_file() {
                found.insert(path.clone());
            } else {
                found.extend(self.walk(path, &filters, &mut errors));
            }
        }

        errors.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Resolved {
            files: found.into_iter().collect(),
            errors,
        })
    }

    /// Collects all matching files from the given root directory.
    ///
    /// Fails on the first entry that cannot be walked.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let filters = Filters::build(self)?;
        let mut errors = Vec::new();
        let mut files = self.walk(root, &filters, &mut errors);
        if let Some((_, e)) = errors.into_iter().next() {
            return Err(e);
        }
        files.sort();
        Ok(files)
    }

    fn walk(
        &self,
        root: &Path,
        filters: &Filters,
        errors: &mut Vec<(PathBuf, FixerError)>,
    ) -> Vec<PathBuf> {
        let mut matched = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|entry| !(self.skip_hidden && is_hidden(entry, root)));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!(path = %path.display(), "{e}");
                    errors.push((path, FixerError::Walk(e)));
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            if !self.extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                    continue;
                }
            }

            let rel_path = path.strip_prefix(root).unwrap_or(path);
            if filters.exclude.is_match(rel_path) {
                continue;
            }
            if let Some(include) = &filters.include {
                if !include.is_match(rel_path) {
                    continue;
                }
            }

            // Content checks read the file, so they run last.
            if !filters.content.is_empty() {
                let Ok(content) = fs::read_to_string(path) else {
                    continue;
                };
                if !filters.content.iter().any(|re| re.is_match(&content)) {
                    continue;
                }
            }

            matched.push(path.to_path_buf());
        }

        matched
    }
}

struct Filters {
    include: Option<GlobSet>,
    exclude: GlobSet,
    content: Vec<Regex>,
}

impl Filters {
    fn build(matcher: &FileMatcher) -> Result<Self> {
        let include = if matcher.include_globs.is_empty() {
            None
        } else {
            Some(glob_set(&matcher.include_globs)?)
        };
        let content = matcher
            .content_patterns
            .iter()
            .map(|p| Ok(Regex::new(p)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            include,
            exclude: glob_set(&matcher.exclude_globs)?,
            content,
        })
    }
}

fn glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn is_hidden(entry: &DirEntry, root: &Path) -> bool {
    entry.path() != root
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("pkg/sub")).unwrap();
        fs::create_dir_all(dir.join("tests")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();

        fs::write(dir.join("pkg/cli.py"), "x = opts.input_fp\n").unwrap();
        fs::write(dir.join("pkg/sub/util.py"), "def f():\n    return 1\n").unwrap();
        fs::write(dir.join("pkg/notes.txt"), "opts.input_fp\n").unwrap();
        fs::write(dir.join("tests/test_cli.py"), "opts = None\n").unwrap();
        fs::write(dir.join(".git/hook.py"), "opts.x\n").unwrap();
    }

    #[test]
    fn test_filter_by_extension() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new().extension("py").collect(dir.path()).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.extension().unwrap() == "py"));
    }

    #[test]
    fn test_leading_dot_in_extension() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new().extensions([".py", "txt"]).collect(dir.path()).unwrap();
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_exclude_glob() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new()
            .extension("py")
            .exclude("tests/**")
            .collect(dir.path())
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.to_string_lossy().contains("tests")));
    }

    #[test]
    fn test_include_glob() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new()
            .extension("py")
            .include("pkg/**")
            .exclude("**/sub/**")
            .collect(dir.path())
            .unwrap();

        assert_eq!(files, vec![dir.path().join("pkg/cli.py")]);
    }

    #[test]
    fn test_hidden_directories() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new()
            .extension("py")
            .skip_hidden(false)
            .collect(dir.path())
            .unwrap();
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_content_pattern() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let files = FileMatcher::new()
            .contains_pattern(r"\bopts\.")
            .collect(dir.path())
            .unwrap();

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_resolve_mixes_files_and_directories() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());

        let resolved = FileMatcher::new()
            .extension("py")
            .resolve(&[
                dir.path().join("pkg/notes.txt"),
                dir.path().join("pkg"),
                dir.path().join("pkg/cli.py"),
            ])
            .unwrap();
        assert!(resolved.errors.is_empty());

        let names: Vec<_> = resolved
            .files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cli.py", "notes.txt", "util.py"]);
    }

    #[test]
    fn test_resolve_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = FileMatcher::new()
            .resolve(&[dir.path().join("missing.py")])
            .unwrap_err();
        assert!(matches!(err, FixerError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_errors_are_collected() {
        let dir = TempDir::new().unwrap();
        create_test_files(dir.path());
        std::os::unix::fs::symlink(dir.path().join("pkg"), dir.path().join("pkg/sub/back")).unwrap();

        let matcher = FileMatcher::new().extension("py").follow_links(true);
        let resolved = matcher.resolve(&[dir.path().join("pkg")]).unwrap();

        assert_eq!(resolved.errors.len(), 1);
        assert!(matches!(resolved.errors[0].1, FixerError::Walk(_)));
        assert!(resolved.files.contains(&dir.path().join("pkg/cli.py")));
        assert!(resolved.files.contains(&dir.path().join("pkg/sub/util.py")));

        let err = matcher.collect(&dir.path().join("pkg")).unwrap_err();
        assert!(matches!(err, FixerError::Walk(_)));
    }

    #[test]
    fn test_invalid_glob() {
        let dir = TempDir::new().unwrap();
        let err = FileMatcher::new().exclude("[").collect(dir.path()).unwrap_err();
        assert!(matches!(err, FixerError::Glob(_)));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(FileMatcher::new().collect(dir.path()).unwrap().is_empty());
    }
}
