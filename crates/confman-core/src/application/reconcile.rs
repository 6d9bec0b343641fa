//! Reconciliation: turning a tagged [`StructuredView`] into document edits.
//!
//! The save path re-reads storage and walks the current lines once,
//! rewriting only what the view's tags ask for:
//!
//! | Line                                   | Action                          |
//! |----------------------------------------|---------------------------------|
//! | header of a section tagged `Delete`    | drop it and its entries         |
//! | header of a section tagged `New`       | conflict: `SectionExists`       |
//! | entry tagged `Update` (first match)    | rewrite as `key = value`        |
//! | entry tagged `Delete` (first match)    | drop                            |
//! | entry tagged `New` already on disk     | conflict: `KeyAlreadyExists`    |
//! | anything else                          | keep verbatim                   |
//!
//! A deleted section's block ends at its last key-value line.  Blank and
//! comment lines after it are kept when another header follows, since they
//! introduce that section, and dropped at the end of the document.
//!
//! `New` entries are inserted after the last entry of their section's first
//! block.  Sections that are not on disk are appended at the end.  After the
//! walk, an `Update` whose line was never seen (removed by someone else since
//! load) is a conflict; a vanished `Delete` is silently satisfied.
//!
//! Lines of sections the view does not hold, including the variables section
//! and sections outside a manager's scope, are copied without being split.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::application::direct::append_section;
use crate::application::view::{PendingOp, SectionNode, StructuredView};
use crate::domain::error::ConfigError;
use crate::domain::line::{classify, split_entry, LineKind};
use crate::domain::symbols::Symbols;

/// The known section whose block is being copied.
struct OpenBlock<'v> {
    name: &'v str,
    node: &'v SectionNode,
    /// `true` for the first block of this section on disk.
    receives_inserts: bool,
    /// Output index just after the block's last entry (or its header).
    insert_at: usize,
}

/// Computes the line sequence that applies every pending tag of `view` to
/// `lines`.
///
/// The input is not modified; the caller writes the result.
///
/// # Errors
///
/// - [`ConfigError::SectionExists`] for a `New` section already on disk.
/// - [`ConfigError::KeyAlreadyExists`] for a `New` entry already on disk.
/// - [`ConfigError::KeyNotFound`] for an `Update` whose line is gone.
/// - [`ConfigError::MalformedLine`] for a malformed line in a known section.
pub fn reconcile(
    lines: &[String],
    view: &StructuredView,
    symbols: &Symbols,
) -> Result<Vec<String>, ConfigError> {
    let sections = view.all_sections();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + view.pending_changes());
    let mut open: Option<OpenBlock<'_>> = None;
    let mut dropping = false;
    let mut held: Vec<&String> = Vec::new();
    let mut sections_on_disk: HashSet<&str> = HashSet::new();
    let mut keys_on_disk: HashSet<(&str, &str)> = HashSet::new();

    for line in lines {
        let kind = classify(line, symbols);

        if let LineKind::SectionHeader(name) = kind {
            close_block(&mut out, open.take(), symbols);
            out.extend(held.drain(..).cloned());
            dropping = false;

            let Some((known_name, node)) = sections.get_key_value(name) else {
                out.push(line.clone());
                continue;
            };
            match node.pending() {
                PendingOp::Delete => {
                    debug!("dropping section [{name}]");
                    dropping = true;
                    continue;
                }
                PendingOp::New => return Err(ConfigError::SectionExists(name.to_string())),
                PendingOp::None | PendingOp::Update => {}
            }

            out.push(line.clone());
            open = Some(OpenBlock {
                name: known_name.as_str(),
                node,
                receives_inserts: sections_on_disk.insert(known_name.as_str()),
                insert_at: out.len(),
            });
            continue;
        }

        if dropping {
            match kind {
                LineKind::KeyValue => held.clear(),
                _ => held.push(line),
            }
            continue;
        }

        let block = match (&kind, open.as_mut()) {
            (LineKind::KeyValue, Some(block)) => block,
            _ => {
                out.push(line.clone());
                continue;
            }
        };

        let (key, _) = split_entry(line, symbols)?;
        let first_occurrence = keys_on_disk.insert((block.name, key));
        let entry = block.node.all_entries().get(key).filter(|_| first_occurrence);

        match entry.map(|e| (e.pending(), e)) {
            Some((PendingOp::New, _)) => {
                return Err(ConfigError::KeyAlreadyExists {
                    section: block.name.to_string(),
                    key: key.to_string(),
                });
            }
            Some((PendingOp::Update, e)) => {
                debug!("updating [{}] {key}", block.name);
                out.push(symbols.format_entry(key, e.raw_value()));
            }
            Some((PendingOp::Delete, _)) => {
                debug!("deleting [{}] {key}", block.name);
            }
            Some((PendingOp::None, _)) | None => out.push(line.clone()),
        }

        if block.receives_inserts {
            block.insert_at = out.len();
        }
    }
    close_block(&mut out, open.take(), symbols);

    for (name, node) in sections {
        if node.is_pending_deletion() {
            continue;
        }
        let on_disk = sections_on_disk.contains(name.as_str());

        for (key, entry) in node.all_entries() {
            let seen = keys_on_disk.contains(&(name.as_str(), key.as_str()));
            match entry.pending() {
                PendingOp::Update if !seen => return Err(ConfigError::key_not_found(name, key)),
                PendingOp::Delete if !seen => {
                    warn!("[{name}] {key} was already removed from storage");
                }
                _ => {}
            }
        }

        if !on_disk {
            let entries = new_entry_lines(node, symbols);
            if node.pending() == PendingOp::New || !entries.is_empty() {
                debug!("appending section [{name}] with {} entries", entries.len());
                append_section(&mut out, symbols.format_header(name), entries);
            }
        }
    }

    Ok(out)
}

/// Inserts the `New` entries of a block that receives inserts.
fn close_block(out: &mut Vec<String>, block: Option<OpenBlock<'_>>, symbols: &Symbols) {
    let Some(block) = block else {
        return;
    };
    if !block.receives_inserts {
        return;
    }
    let entries = new_entry_lines(block.node, symbols);
    if !entries.is_empty() {
        debug!("inserting {} entries into [{}]", entries.len(), block.name);
        out.splice(block.insert_at..block.insert_at, entries);
    }
}

fn new_entry_lines(node: &SectionNode, symbols: &Symbols) -> Vec<String> {
    node.all_entries()
        .iter()
        .filter(|(_, entry)| entry.pending() == PendingOp::New)
        .map(|(key, entry)| symbols.format_entry(key, entry.raw_value()))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
