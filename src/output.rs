//! Output handling for generated files.
//!
//! The executor hands every rendered text to an [`OutputWriter`] together
//! with an [`AccessMode`]. [`BufferedOutput`] collects the writes in memory
//! and persists each resulting file atomically.

use crate::error::Result;
use indexmap::IndexMap;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// How a write affects existing content of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Replace existing content.
    Write,
    /// Extend existing content.
    Append,
}

/// Destination of generated text.
pub trait OutputWriter {
    fn write(&mut self, path: &Path, text: &str, mode: AccessMode) -> Result<()>;
}

/// In-memory output, keyed by path in order of first write.
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    files: IndexMap<PathBuf, String>,
    writes: Vec<(PathBuf, AccessMode)>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(path, text)| (path.as_path(), text.as_str()))
    }

    /// Every write received, in order.
    pub fn writes(&self) -> &[(PathBuf, AccessMode)] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Applies `transform` to the content of every buffered file.
    pub fn map_files<F>(&mut self, mut transform: F)
    where
        F: FnMut(&Path, &str) -> String,
    {
        for (path, text) in self.files.iter_mut() {
            *text = transform(path, text);
        }
    }

    /// Writes every buffered file to disk.
    pub fn persist(&self) -> Result<()> {
        for (path, text) in &self.files {
            write_file_atomic(path, text)?;
        }
        Ok(())
    }
}

impl OutputWriter for BufferedOutput {
    fn write(&mut self, path: &Path, text: &str, mode: AccessMode) -> Result<()> {
        self.writes.push((path.to_path_buf(), mode));
        let content = self.files.entry(path.to_path_buf()).or_default();
        if mode == AccessMode::Write {
            content.clear();
        }
        content.push_str(text);
        Ok(())
    }
}

/// Writes `content` to `path` through a temporary file in the same
/// directory that is renamed over the target.
pub fn write_file_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut file = NamedTempFile::new_in(&parent)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    debug!("Wrote file: {}", path.display());
    Ok(())
}
