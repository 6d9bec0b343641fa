//! The configurable tokens that give a document its shape.
//!
//! ```text
//! [CONFIG_ARGS]            <- section delimiters + variable section name
//! host = localhost         <- assignment symbol
//! # comment                <- comment symbol
//! [Server]
//! url = http://%host%/api  <- variable delimiters
//! ```
//!
//! A single [`Symbols`] value is built at construction time and threaded by
//! reference through the classifier, the splitter, the resolver and both
//! stores.

use serde::Deserialize;

use crate::domain::error::ConfigError;
use crate::domain::line::{classify, LineKind};

/// Default assignment symbol.
pub const DEFAULT_ASSIGNMENT: &str = "=";
/// Default comment symbol.
pub const DEFAULT_COMMENT: char = '#';
/// Default name of the reserved variables section.
pub const DEFAULT_VARIABLE_SECTION: &str = "CONFIG_ARGS";

/// An opening/closing token pair such as `[`/`]` or `%`/`%`.
///
/// Deserializes from a two-element array: `section_symbols = ["<", ">"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "[String; 2]")]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl From<[String; 2]> for Delimiters {
    fn from([open, close]: [String; 2]) -> Self {
        Self { open, close }
    }
}

/// Every symbol the parser needs.  `Default` gives the stock dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Symbols {
    #[serde(default = "default_assignment")]
    pub assignment_symbol: String,
    #[serde(default = "default_comment")]
    pub comment_symbol: char,
    #[serde(default = "default_section_symbols")]
    pub section_symbols: Delimiters,
    #[serde(default = "default_variable_symbols")]
    pub variable_symbols: Delimiters,
    #[serde(default = "default_variable_section")]
    pub variable_section: String,
}

fn default_assignment() -> String {
    DEFAULT_ASSIGNMENT.to_string()
}
fn default_comment() -> char {
    DEFAULT_COMMENT
}
fn default_section_symbols() -> Delimiters {
    Delimiters::new("[", "]")
}
fn default_variable_symbols() -> Delimiters {
    Delimiters::new("%", "%")
}
fn default_variable_section() -> String {
    DEFAULT_VARIABLE_SECTION.to_string()
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            assignment_symbol: default_assignment(),
            comment_symbol: default_comment(),
            section_symbols: default_section_symbols(),
            variable_symbols: default_variable_symbols(),
            variable_section: default_variable_section(),
        }
    }
}

impl Symbols {
    /// Rejects symbol sets the scanner cannot work with.
    ///
    /// Empty tokens would match at every position, which turns the splitter
    /// and the resolver into infinite loops.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSymbols`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("assignment_symbol", self.assignment_symbol.as_str()),
            ("section_symbols[0]", self.section_symbols.open.as_str()),
            ("section_symbols[1]", self.section_symbols.close.as_str()),
            ("variable_symbols[0]", self.variable_symbols.open.as_str()),
            ("variable_symbols[1]", self.variable_symbols.close.as_str()),
        ];
        for (field, value) in checks {
            if value.is_empty() {
                return Err(ConfigError::InvalidSymbols(format!("{field} must not be empty")));
            }
        }
        if self.comment_symbol.is_whitespace() {
            return Err(ConfigError::InvalidSymbols(
                "comment_symbol must not be whitespace".to_string(),
            ));
        }
        Ok(())
    }

    /// Formats the line written by `new` and `update`: `key = value`.
    pub fn format_entry(&self, key: &str, value: &str) -> String {
        format!("{key} {} {value}", self.assignment_symbol)
    }

    /// Formats a section header line: `[name]`.
    pub fn format_header(&self, name: &str) -> String {
        format!(
            "{}{name}{}",
            self.section_symbols.open, self.section_symbols.close
        )
    }

    /// Checks that `key = value` is written as exactly one key-value line
    /// that splits back into the same key and value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEntry`] for an empty key, a line break
    /// in the key or value, a key containing the assignment symbol, or a
    /// line that would read as a comment or header.
    pub fn check_entry(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |text: &str, reason| ConfigError::InvalidEntry {
            text: text.to_string(),
            reason,
        };
        if key.is_empty() {
            return Err(invalid(key, "key is empty"));
        }
        if has_line_break(key) {
            return Err(invalid(key, "key contains a line break"));
        }
        if has_line_break(value) {
            return Err(invalid(value, "value contains a line break"));
        }
        if key.contains(self.assignment_symbol.as_str()) {
            return Err(invalid(key, "key contains the assignment symbol"));
        }
        let line = self.format_entry(key, value);
        match classify(&line, self) {
            LineKind::KeyValue => Ok(()),
            LineKind::Comment => Err(invalid(&line, "line would read as a comment")),
            LineKind::SectionHeader(_) | LineKind::Blank => {
                Err(invalid(&line, "line would read as a section header"))
            }
        }
    }

    /// Checks that a header written for `name` reads back as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEntry`] for an empty name, a line break,
    /// or a name that contains the closing section delimiter.
    pub fn check_section_name(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidEntry {
            text: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(invalid("section name is empty"));
        }
        if has_line_break(name) {
            return Err(invalid("section name contains a line break"));
        }
        if name.contains(self.section_symbols.close.as_str()) {
            return Err(invalid("section name contains the closing delimiter"));
        }
        match classify(&self.format_header(name), self) {
            LineKind::SectionHeader(read_back) if read_back == name => Ok(()),
            _ => Err(invalid("header would not read back as this name")),
        }
    }

    /// `true` if `section` is the reserved variables section.
    pub fn is_variable_section(&self, section: &str) -> bool {
        section == self.variable_section
    }
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
