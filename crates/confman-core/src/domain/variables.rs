//! Placeholder substitution.
//!
//! Values may reference entries of the reserved variables section through
//! placeholders such as `%host%`.  Substitution happens only when a value is
//! read; stored text always keeps its placeholders.
//!
//! # Scan order
//!
//! The resolver walks the value once, left to right.  For each opening
//! delimiter it tries every following closing delimiter in turn until the
//! text between them names a bound variable.  A replacement is never
//! re-scanned, so a variable whose value itself contains `%x%` is inserted
//! literally.
//!
//! ```text
//! "http://%host%/api"      host=localhost   ->  "http://localhost/api"
//! "%missing%"              (unbound)        ->  "%missing%"
//! "%a%%b%"                 a=1 b=2          ->  "12"
//! ```

use std::collections::HashMap;

use crate::domain::symbols::Delimiters;

/// Variable name to raw value, as defined in the variables section.
pub type VariableTable = HashMap<String, String>;

/// Resolves every bound placeholder in `value`.
///
/// Unbound or unterminated placeholders are returned verbatim.  With an
/// empty delimiter nothing is substituted.
pub fn resolve(value: &str, variables: &VariableTable, delimiters: &Delimiters) -> String {
    let open = delimiters.open.as_str();
    let close = delimiters.close.as_str();
    if open.is_empty() || close.is_empty() || (!value.contains(open) && !value.contains(close)) {
        return value.to_string();
    }

    let mut line = value.to_string();
    let mut cursor = 0;

    while let Some(i) = find_from(&line, open, cursor) {
        let name_start = i + open.len();
        let mut search = name_start;
        let mut saw_close = false;
        let mut replaced_end = None;

        while let Some(j) = find_from(&line, close, search) {
            saw_close = true;
            if let Some(bound) = variables.get(&line[name_start..j]) {
                line.replace_range(i..j + close.len(), bound);
                replaced_end = Some(i + bound.len());
                break;
            }
            search = j + close.len();
        }

        // An opening delimiter with nothing to close it ends the scan.
        if !saw_close {
            break;
        }
        cursor = replaced_end.unwrap_or(name_start);
    }

    line
}

/// `str::find` starting at byte offset `from`.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .find(needle)
        .map(|offset| offset + from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
