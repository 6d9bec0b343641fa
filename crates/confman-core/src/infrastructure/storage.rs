//! Document storage adapters.
//!
//! The stores only ever see a document as a `Vec<String>` of lines.  Where
//! those lines come from is decided here:
//!
//! - [`FileStorage`] reads and rewrites a file on disk (production).
//! - [`MemoryStorage`] keeps the text in memory (tests, benches, embedding).
//!
//! Every write replaces the whole document.  There is no append mode and no
//! temp-file rename, so a crash mid-write can truncate the file.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::error::ConfigError;

/// Whole-document read/write access.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentStorage {
    /// Reads the complete document as lines, without terminators.
    fn read_lines(&self) -> Result<Vec<String>, ConfigError>;
    /// Replaces the complete document with `lines`.
    fn write_lines(&self, lines: &[String]) -> Result<(), ConfigError>;
}

/// Splits document text into lines.  `\r\n` and `\n` are both accepted.
pub fn split_document(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Joins lines back into document text, newline-terminating every line.
pub fn render_document(lines: &[String]) -> String {
    let capacity = lines.iter().map(|l| l.len() + 1).sum();
    let mut out = String::with_capacity(capacity);
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ── File storage ──────────────────────────────────────────────────────────────

/// A document backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStorage for FileStorage {
    fn read_lines(&self) -> Result<Vec<String>, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(split_document(&text))
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), ConfigError> {
        debug!("rewriting {} ({} lines)", self.path.display(), lines.len());
        std::fs::write(&self.path, render_document(lines)).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

// ── In-memory storage ─────────────────────────────────────────────────────────

/// A document held in memory.  Counts writes so callers can assert on them.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    text: RefCell<String>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RefCell::new(text.into()),
            writes: Cell::new(0),
        }
    }

    /// Current document text.
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Replaces the document text without counting a write.  Simulates an
    /// edit made by another process.
    pub fn replace_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = text.into();
    }

    /// Number of `write_lines` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl DocumentStorage for MemoryStorage {
    fn read_lines(&self) -> Result<Vec<String>, ConfigError> {
        Ok(split_document(&self.text.borrow()))
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), ConfigError> {
        *self.text.borrow_mut() = render_document(lines);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
