//! Batch reformatting of C source files.
//! Walks a directory tree, selects files by glob patterns on their file
//! name and rewrites every file whose formatted text differs.

use crate::constants::DEFAULT_SOURCE_PATTERNS;
use crate::error::{Error, Result};
use crate::formatter::format_text;
use crate::output::write_file_atomic;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of one formatting pass.
#[derive(Debug, Default)]
pub struct FormatReport {
    /// Number of files inspected.
    pub checked: usize,
    /// Files whose content changed or, in check mode, would change.
    pub changed: Vec<PathBuf>,
    /// Files that could not be formatted, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl FormatReport {
    fn record(&mut self, path: &Path, result: Result<bool>) {
        self.checked += 1;
        match result {
            Ok(true) => self.changed.push(path.to_path_buf()),
            Ok(false) => {}
            Err(e) => {
                error!("Unable to format: {} with error: {}", path.display(), e);
                self.failed.push((path.to_path_buf(), e.to_string()));
            }
        }
    }
}

/// Builds a glob set from `patterns`, using the default source patterns
/// when none are given.
///
/// # Errors
/// * `Error::GlobError` if a pattern is invalid
pub fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    if patterns.is_empty() {
        for pattern in DEFAULT_SOURCE_PATTERNS {
            builder.add(Glob::new(pattern).map_err(|e| Error::GlobError(e.to_string()))?);
        }
    } else {
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref()).map_err(|e| Error::GlobError(e.to_string()))?);
        }
    }
    builder.build().map_err(|e| Error::GlobError(e.to_string()))
}

/// Formats source files in place.
pub struct Processor {
    patterns: GlobSet,
    check: bool,
}

impl Processor {
    pub fn new<S: AsRef<str>>(patterns: &[S], check: bool) -> Result<Self> {
        Ok(Self { patterns: build_glob_set(patterns)?, check })
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.patterns.is_match(name))
    }

    /// Formats one file; returns whether its content differs from the
    /// formatted text. In check mode the file is left untouched.
    pub fn process_file(&self, path: &Path) -> Result<bool> {
        let original = fs::read_to_string(path)?;
        let formatted = format_text(&original);
        if formatted == original {
            debug!("Unchanged: {}", path.display());
            return Ok(false);
        }
        if self.check {
            info!("Would reformat: {}", path.display());
        } else {
            write_file_atomic(path, &formatted)?;
            info!("Reformatted: {}", path.display());
        }
        Ok(true)
    }

    /// Formats `root`, which is a single file or a directory tree.
    ///
    /// # Errors
    /// * `Error::MissingCollaboratorFile` if `root` does not exist
    pub fn process<P: AsRef<Path>>(&self, root: P) -> Result<FormatReport> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(Error::MissingCollaboratorFile(root.to_path_buf()));
        }

        let mut report = FormatReport::default();
        if root.is_file() {
            report.record(root, self.process_file(root));
            return Ok(report);
        }

        // A file that cannot be formatted does not stop the walk.
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    error!("Unable to read: {} with error: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_selected(path) {
                continue;
            }
            report.record(path, self.process_file(path));
        }
        Ok(report)
    }
}
