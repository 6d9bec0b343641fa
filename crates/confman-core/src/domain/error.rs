//! Error taxonomy shared by every confman component.
//!
//! Every fallible operation in the crate returns [`ConfigError`].  Expected
//! conditions such as a missing key are ordinary variants, so callers can
//! `match` on them instead of inspecting strings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the parser, the stores, and the storage adapters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No section argument was given and the manager has no fixed scope.
    #[error("no section given and the manager is not scoped to one")]
    MissingScope,

    /// An explicit section conflicts with the manager's fixed scope.
    #[error("cannot operate on section '{requested}': manager is scoped to '{scope}'")]
    CrossSection { scope: String, requested: String },

    /// `get`, `update` or `delete` targeted a key that does not exist.
    #[error("key '{key}' not found in section '{section}'")]
    KeyNotFound { section: String, key: String },

    /// `new` targeted a key that already exists.
    #[error("key '{key}' already exists in section '{section}'")]
    KeyAlreadyExists { section: String, key: String },

    /// A key-value line does not contain the assignment symbol.
    #[error("malformed line (no assignment symbol): {line:?}")]
    MalformedLine { line: String },

    /// A section was created while a live section of that name exists.
    #[error("section '{0}' already exists; delete it first")]
    SectionExists(String),

    /// A section was created while one of that name is pending deletion.
    #[error("section '{0}' is pending deletion; save changes first")]
    PendingDeletion(String),

    /// A section-level operation targeted a section that does not exist.
    #[error("section '{0}' not found")]
    SectionNotFound(String),

    /// An ordinary operation targeted the reserved variables section.
    #[error("section '{0}' holds variables and cannot be edited as entries")]
    ReservedSection(String),

    /// A key, value or section name would not survive being written as a
    /// line and read back.
    #[error("invalid entry {text:?}: {reason}")]
    InvalidEntry { text: String, reason: &'static str },

    /// A configured symbol cannot be used (for example an empty delimiter).
    #[error("invalid symbols: {0}")]
    InvalidSymbols(String),

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The options file could not be parsed.
    #[error("failed to parse options TOML: {0}")]
    Options(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn key_not_found(section: &str, key: &str) -> Self {
        Self::KeyNotFound {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn key_exists(section: &str, key: &str) -> Self {
        Self::KeyAlreadyExists {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
