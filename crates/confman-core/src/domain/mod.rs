//! Pure parsing rules for confman documents.
//!
//! Nothing in this module touches the file system.  Each function takes a
//! line or a value plus the configured [`symbols::Symbols`] and returns a
//! result, which keeps the rules testable in isolation.

pub mod error;
pub mod line;
pub mod symbols;
pub mod variables;
