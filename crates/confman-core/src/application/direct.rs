//! Direct mode: every call scans the stored document from scratch.
//!
//! # Scan
//!
//! One pass over the lines tracks the currently open section and collects:
//!
//! - the index of the first line in the target section whose key matches;
//! - the insertion point for `new` (just after the last entry of the target
//!   section's first block, or just after its header if it has none);
//! - the variable table, from every line of the variables section, wherever
//!   it sits relative to the match.
//!
//! Lines of unrelated sections are never split, so a malformed line only
//! fails the operations that actually have to read it.
//!
//! # Writes
//!
//! Mutations rebuild the full line list and write it back once.  The write
//! happens only after the target has been resolved, so a failed call leaves
//! storage untouched.

use tracing::{debug, info};

use crate::application::{target_section, ConfigStore};
use crate::domain::error::ConfigError;
use crate::domain::line::{classify, split_entry, LineKind};
use crate::domain::symbols::Symbols;
use crate::domain::variables::{resolve, VariableTable};
use crate::infrastructure::storage::DocumentStorage;

/// What to do with the located entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Get,
    New(&'a str),
    Update(&'a str),
    Delete,
}

/// Result of a single pass over the document.
#[derive(Debug, Default)]
struct ScanOutcome {
    /// Line index of the first matching entry.
    found: Option<usize>,
    /// Where a new entry goes; `None` when the section is absent.
    insert_at: Option<usize>,
    variables: VariableTable,
}

fn scan(
    lines: &[String],
    section: &str,
    key: &str,
    symbols: &Symbols,
) -> Result<ScanOutcome, ConfigError> {
    let mut outcome = ScanOutcome::default();
    let mut current: Option<&str> = None;
    // Only the first block of a repeated section receives insertions.
    let mut in_first_block = false;
    let mut first_block_closed = false;

    for (idx, line) in lines.iter().enumerate() {
        match classify(line, symbols) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::SectionHeader(name) => {
                if in_first_block {
                    in_first_block = false;
                    first_block_closed = true;
                }
                if name == section && !first_block_closed {
                    in_first_block = true;
                    outcome.insert_at = Some(idx + 1);
                }
                current = Some(name);
            }
            LineKind::KeyValue => {
                let Some(open) = current else {
                    continue;
                };
                if symbols.is_variable_section(open) {
                    let (name, value) = split_entry(line, symbols)?;
                    outcome.variables.insert(name.to_string(), value.to_string());
                } else if open == section {
                    if in_first_block {
                        outcome.insert_at = Some(idx + 1);
                    }
                    if outcome.found.is_none() {
                        let (candidate, _) = split_entry(line, symbols)?;
                        if candidate == key {
                            outcome.found = Some(idx);
                        }
                    }
                }
            }
        }
    }

    debug!(
        "scan [{section}] {key}: found={:?} insert_at={:?} variables={}",
        outcome.found,
        outcome.insert_at,
        outcome.variables.len()
    );
    Ok(outcome)
}

/// Collects the variables section of `lines` into a table.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedLine`] for a variable line without an
/// assignment symbol.
pub fn collect_variables(lines: &[String], symbols: &Symbols) -> Result<VariableTable, ConfigError> {
    let mut variables = VariableTable::new();
    let mut in_variables = false;
    for line in lines {
        match classify(line, symbols) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::SectionHeader(name) => in_variables = symbols.is_variable_section(name),
            LineKind::KeyValue if in_variables => {
                let (name, value) = split_entry(line, symbols)?;
                variables.insert(name.to_string(), value.to_string());
            }
            LineKind::KeyValue => {}
        }
    }
    Ok(variables)
}

/// Appends a header and its entries at the end of the document, separated
/// from the previous content by one blank line.
pub(crate) fn append_section(lines: &mut Vec<String>, header: String, entries: Vec<String>) {
    if lines.last().is_some_and(|last| !last.is_empty()) {
        lines.push(String::new());
    }
    lines.push(header);
    lines.extend(entries);
}

/// Direct-mode store over any [`DocumentStorage`].
#[derive(Debug)]
pub struct DirectStore<S> {
    storage: S,
    symbols: Symbols,
    scope: Option<String>,
}

impl<S: DocumentStorage> DirectStore<S> {
    /// Creates a store.  `scope` restricts every call to one section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSymbols`] if `symbols` fails validation.
    pub fn new(storage: S, symbols: Symbols, scope: Option<String>) -> Result<Self, ConfigError> {
        symbols.validate()?;
        Ok(Self {
            storage,
            symbols,
            scope,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Reads the document and returns its variable table.
    ///
    /// # Errors
    ///
    /// Propagates storage errors and malformed variable lines.
    pub fn variables(&self) -> Result<VariableTable, ConfigError> {
        collect_variables(&self.storage.read_lines()?, &self.symbols)
    }

    /// Runs one operation against `section`/`key`.
    ///
    /// Returns `Some(value)` for [`Operation::Get`] and `None` otherwise.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::CrossSection`] / [`ConfigError::ReservedSection`] before
    ///   any I/O.
    /// - [`ConfigError::KeyNotFound`] for get/update/delete of a missing key.
    /// - [`ConfigError::KeyAlreadyExists`] for new on an existing key.
    /// - [`ConfigError::MalformedLine`] and storage errors as encountered.
    pub fn apply(
        &self,
        operation: Operation<'_>,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        let section = target_section(self.scope.as_deref(), Some(section))?;
        if self.symbols.is_variable_section(section) {
            return Err(ConfigError::ReservedSection(section.to_string()));
        }
        if let Operation::New(value) | Operation::Update(value) = operation {
            self.symbols.check_entry(key, value)?;
        }

        let mut lines = self.storage.read_lines()?;
        let outcome = scan(&lines, section, key, &self.symbols)?;

        let require_found = || outcome.found.ok_or_else(|| ConfigError::key_not_found(section, key));

        match operation {
            Operation::Get => {
                let idx = require_found()?;
                let (_, raw) = split_entry(&lines[idx], &self.symbols)?;
                let value = resolve(raw, &outcome.variables, &self.symbols.variable_symbols);
                return Ok(Some(value));
            }
            Operation::New(value) => {
                if outcome.found.is_some() {
                    return Err(ConfigError::key_exists(section, key));
                }
                let entry = self.symbols.format_entry(key, value);
                match outcome.insert_at {
                    Some(at) => lines.insert(at, entry),
                    None => {
                        self.symbols.check_section_name(section)?;
                        append_section(&mut lines, self.symbols.format_header(section), vec![entry]);
                    }
                }
            }
            Operation::Update(value) => {
                let idx = require_found()?;
                let (original_key, _) = split_entry(&lines[idx], &self.symbols)?;
                let replacement = self.symbols.format_entry(original_key, value);
                lines[idx] = replacement;
            }
            Operation::Delete => {
                let idx = require_found()?;
                lines.remove(idx);
            }
        }

        self.storage.write_lines(&lines)?;
        info!("{operation:?} [{section}] {key}: document rewritten");
        Ok(None)
    }
}

impl<S: DocumentStorage> ConfigStore for DirectStore<S> {
    fn get(&self, section: Option<&str>, key: &str) -> Result<String, ConfigError> {
        let section = target_section(self.scope.as_deref(), section)?;
        self.apply(Operation::Get, section, key)?
            .ok_or_else(|| ConfigError::key_not_found(section, key))
    }

    fn create(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError> {
        let section = target_section(self.scope.as_deref(), section)?;
        self.apply(Operation::New(value), section, key).map(|_| ())
    }

    fn update(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError> {
        let section = target_section(self.scope.as_deref(), section)?;
        self.apply(Operation::Update(value), section, key).map(|_| ())
    }

    fn delete(&mut self, section: Option<&str>, key: &str) -> Result<(), ConfigError> {
        let section = target_section(self.scope.as_deref(), section)?;
        self.apply(Operation::Delete, section, key).map(|_| ())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
