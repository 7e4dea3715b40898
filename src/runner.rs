//! Running fixers over files on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn};

use crate::config::FixerConfig;
use crate::diff::{unified_diff, DiffSummary};
use crate::driver::fix_source;
use crate::error::{FixerError, Result};
use crate::matcher::FileMatcher;
use crate::registry::{Fixer, FixerRegistry};
use crate::report::{FileReport, FileStatus, RunReport};

/// Builder for a fixer run over files and directories.
///
/// ```rust,no_run
/// use fixer_dsl::prelude::*;
///
/// let registry = FixerRegistry::new()?;
/// let report = FixRunner::new(&registry)
///     .path("scripts/")
///     .fixer("replace_opts")
///     .fixer("options_object")
///     .dry_run()
///     .run()?;
/// print!("{}", report.diff());
/// # Ok::<(), fixer_dsl::error::FixerError>(())
/// ```
pub struct FixRunner<'r> {
    registry: &'r FixerRegistry,
    paths: Vec<PathBuf>,
    fixers: Vec<String>,
    skip: Vec<String>,
    matcher: FileMatcher,
    dry_run: bool,
    backup: bool,
    jobs: Option<usize>,
}

impl<'r> FixRunner<'r> {
    /// Creates a runner that fixes `.py` files with the registry's default order.
    pub fn new(registry: &'r FixerRegistry) -> Self {
        Self {
            registry,
            paths: Vec::new(),
            fixers: Vec::new(),
            skip: Vec::new(),
            matcher: FileMatcher::new().extension("py"),
            dry_run: false,
            backup: false,
            jobs: None,
        }
    }

    /// Creates a runner using the file filters and job count from `config`.
    pub fn from_config(registry: &'r FixerRegistry, config: &FixerConfig) -> Self {
        let matcher = FileMatcher::new().extensions(&config.extensions);
        let matcher = config.include.iter().fold(matcher, |m, glob| m.include(glob));
        let matcher = config.exclude.iter().fold(matcher, |m, glob| m.exclude(glob));
        Self {
            matcher,
            jobs: config.jobs,
            ..Self::new(registry)
        }
    }

    /// Adds a file or directory to fix.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Appends a fixer to the pass order. Without any, the default order runs.
    pub fn fixer(mut self, name: impl Into<String>) -> Self {
        self.fixers.push(name.into());
        self
    }

    pub fn fixers(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fixers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Leaves a fixer out of the pass order.
    pub fn skip(mut self, name: impl Into<String>) -> Self {
        self.skip.push(name.into());
        self
    }

    /// Adjusts which files inside directories are picked up.
    pub fn files<F>(mut self, f: F) -> Self
    where
        F: FnOnce(FileMatcher) -> FileMatcher,
    {
        self.matcher = f(self.matcher);
        self
    }

    /// Computes diffs without writing anything.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Keeps the original bytes in `<file>.bak` before rewriting.
    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    /// Runs the selected fixers over every matched file.
    ///
    /// Unknown fixers and an empty file set fail the whole run. Anything that
    /// goes wrong inside one file is recorded in its report and leaves the
    /// file untouched.
    pub fn run(self) -> Result<RunReport> {
        let passes = self.registry.select(&self.fixers, &self.skip)?;
        let resolved = self.matcher.resolve(&self.paths)?;
        if resolved.is_empty() {
            return Err(FixerError::NoFilesMatched);
        }
        let files = resolved.files;

        let jobs = self
            .jobs
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .clamp(1, files.len().max(1));
        let names: Vec<String> = passes.iter().map(|f| f.name().to_string()).collect();
        info!(
            files = files.len(),
            jobs,
            dry_run = self.dry_run,
            fixers = %names.join(","),
            "running fixers"
        );

        let next = AtomicUsize::new(0);
        let unwalkable = resolved
            .errors
            .into_iter()
            .map(|(path, e)| FileReport::failed(path, e));
        let reports = Mutex::new(unwalkable.collect::<Vec<_>>());
        thread::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(|| {
                    while let Some(path) = files.get(next.fetch_add(1, Ordering::Relaxed)) {
                        let report = self.process_file(path, &passes);
                        reports
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(report);
                    }
                });
            }
        });

        let reports = reports.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(RunReport::new(self.dry_run, names, reports))
    }

    fn process_file(&self, path: &Path, passes: &[&Fixer]) -> FileReport {
        let _span = info_span!("file", path = %path.display()).entered();
        match self.fix_file(path, passes) {
            Ok(report) => report,
            Err(e) => {
                let e = e.in_file(path);
                warn!("{e}");
                FileReport::failed(path.to_path_buf(), e.root())
            }
        }
    }

    fn fix_file(&self, path: &Path, passes: &[&Fixer]) -> Result<FileReport> {
        let original = fs::read_to_string(path)?;
        let output = fix_source(&original, passes)?;
        if output.records.is_empty() {
            debug!("no matches");
            return Ok(FileReport::unmatched(path.to_path_buf()));
        }

        let modified = output.text_or(&original);
        let changed = output.is_modified(&original);
        let diff = changed.then(|| unified_diff(&original, modified, path));
        let changes = DiffSummary::from_diff(&original, modified);
        let mut written = false;
        if changed && !self.dry_run {
            write_atomic(path, modified, self.backup)?;
            written = true;
            info!(rewrites = output.records.len(), "fixed");
        }

        Ok(FileReport {
            path: path.to_path_buf(),
            status: FileStatus::Matched,
            matches: output.records,
            written,
            diff,
            changes,
        })
    }
}

/// Path of the backup kept next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Replaces a file's contents via a temp file renamed over it.
///
/// The temp file lives in the same directory so the rename stays on one
/// filesystem; the original permissions are carried over.
pub fn write_atomic(path: &Path, contents: &str, backup: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();
    if backup {
        fs::copy(path, backup_path(path))?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path).map_err(|e| FixerError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "opts\n").unwrap();

        write_atomic(&path, "options\n", false).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "options\n");
        assert!(!backup_path(&path).exists());
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomic_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "opts\n").unwrap();

        write_atomic(&path, "options\n", true).unwrap();

        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "opts\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "options\n");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(backup_path(Path::new("pkg/a.py")), PathBuf::from("pkg/a.py.bak"));
    }

    #[test]
    fn test_run_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = opts.input_fp\n").unwrap();

        let registry = FixerRegistry::new().unwrap();
        let report = FixRunner::new(&registry).path(&path).jobs(1).run().unwrap();

        assert_eq!(report.summary.written_files, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = options['input_fp']\n");
    }

    #[test]
    fn test_unknown_fixer_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "opts\n").unwrap();

        let registry = FixerRegistry::new().unwrap();
        let err = FixRunner::new(&registry)
            .path(dir.path())
            .fixer("nope")
            .run()
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "opts\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_error_is_reported_per_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.py"), "x = opts.a\n").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("pkg/loop")).unwrap();

        let registry = FixerRegistry::new().unwrap();
        let report = FixRunner::new(&registry)
            .path(dir.path())
            .files(|f| f.follow_links(true))
            .run()
            .unwrap();

        assert!(report.has_errors());
        assert_eq!(report.summary.failed_files, 1);
        assert_eq!(report.failures().next().unwrap().path, dir.path().join("pkg/loop"));
        assert_eq!(
            fs::read_to_string(dir.path().join("pkg/a.py")).unwrap(),
            "x = options['a']\n"
        );
    }

    #[test]
    fn test_no_files() {
        let dir = TempDir::new().unwrap();
        let registry = FixerRegistry::new().unwrap();
        let err = FixRunner::new(&registry).path(dir.path()).run().unwrap_err();
        assert!(matches!(err, FixerError::NoFilesMatched));
    }
}
