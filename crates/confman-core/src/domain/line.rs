//! Line classification and key/value splitting.
//!
//! Both functions work on a single raw line and never trim more than the
//! format allows, so a line read and written back through them is unchanged.

use crate::domain::error::ConfigError;
use crate::domain::symbols::Symbols;

/// What a raw document line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Zero-length line.
    Blank,
    /// Line starting with the comment symbol.
    Comment,
    /// `[name]` header; carries the text between the delimiters.
    SectionHeader(&'a str),
    /// Anything else.  Splitting may still fail with `MalformedLine`.
    KeyValue,
}

/// Classifies `line` using the configured comment and section symbols.
///
/// Only the first character decides whether a line is a comment.  A header
/// must both start with the opening and end with the closing delimiter;
/// anything else (including `[unterminated`) is a key-value line.
pub fn classify<'a>(line: &'a str, symbols: &Symbols) -> LineKind<'a> {
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with(symbols.comment_symbol) {
        return LineKind::Comment;
    }

    let open = symbols.section_symbols.open.as_str();
    let close = symbols.section_symbols.close.as_str();
    if line.len() >= open.len() + close.len() && line.starts_with(open) && line.ends_with(close) {
        return LineKind::SectionHeader(&line[open.len()..line.len() - close.len()]);
    }

    LineKind::KeyValue
}

/// Splits a key-value line at the first assignment symbol.
///
/// Exactly one space before the symbol is removed from the key and exactly
/// one space after it is removed from the value.  Additional spaces and tabs
/// are kept as part of the key or value.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedLine`] if the assignment symbol is absent.
pub fn split_entry<'a>(line: &'a str, symbols: &Symbols) -> Result<(&'a str, &'a str), ConfigError> {
    let (key, value) = line
        .split_once(symbols.assignment_symbol.as_str())
        .ok_or_else(|| ConfigError::MalformedLine {
            line: line.to_string(),
        })?;

    let key = key.strip_suffix(' ').unwrap_or(key);
    let value = value.strip_prefix(' ').unwrap_or(value);
    Ok((key, value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
