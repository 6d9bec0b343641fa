//! Store strategies built on the domain rules.
//!
//! Two strategies implement the same [`ConfigStore`] capability:
//!
//! - [`direct::DirectStore`] reads the document on every call and rewrites it
//!   on every mutation.
//! - [`deferred::DeferredStore`] loads a [`view::StructuredView`] once,
//!   mutates only the view, and writes on an explicit
//!   [`deferred::DeferredStore::save`] via the [`reconcile`] pass.
//!
//! Both enforce the same scope rules through [`target_section`].

pub mod deferred;
pub mod direct;
pub mod reconcile;
pub mod view;

use crate::domain::error::ConfigError;

/// The four entry operations every store supports.
///
/// `section` may be `None` only when the store is scoped to one section.
pub trait ConfigStore {
    /// Returns the value of `key` with placeholders resolved.
    fn get(&self, section: Option<&str>, key: &str) -> Result<String, ConfigError>;
    /// Adds a new entry (the `new` operation).  Fails if the key exists.
    fn create(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError>;
    /// Replaces the value of an existing entry.
    fn update(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError>;
    /// Removes an existing entry.
    fn delete(&mut self, section: Option<&str>, key: &str) -> Result<(), ConfigError>;
    /// Persists pending changes and returns how many were written.
    ///
    /// Strategies that write on every call have nothing pending.
    fn save(&mut self) -> Result<usize, ConfigError> {
        Ok(0)
    }
}

/// Decides which section an operation targets.
///
/// | scope     | requested | result                 |
/// |-----------|-----------|------------------------|
/// | `None`    | `None`    | `MissingScope`         |
/// | `None`    | `Some(r)` | `r`                    |
/// | `Some(s)` | `None`    | `s`                    |
/// | `Some(s)` | `Some(s)` | `s`                    |
/// | `Some(s)` | `Some(r)` | `CrossSection`         |
pub fn target_section<'a>(
    scope: Option<&'a str>,
    requested: Option<&'a str>,
) -> Result<&'a str, ConfigError> {
    match (scope, requested) {
        (None, None) => Err(ConfigError::MissingScope),
        (None, Some(r)) => Ok(r),
        (Some(s), None) => Ok(s),
        (Some(s), Some(r)) if s == r => Ok(s),
        (Some(s), Some(r)) => Err(ConfigError::CrossSection {
            scope: s.to_string(),
            requested: r.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
