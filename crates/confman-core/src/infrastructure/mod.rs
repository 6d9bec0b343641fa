//! Infrastructure layer: file-system storage and options loading.
//!
//! **Dependency rule**: this layer may depend on `application` and `domain`,
//! but the domain layer never imports it.

pub mod options;
pub mod storage;
