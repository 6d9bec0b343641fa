//! Manager options and store construction.
//!
//! Options can be built in code or read from a TOML file:
//!
//! ```toml
//! file = "app.conf"           # required; relative to this options file
//! section = "Server"          # optional scope
//! mode = "deferred"           # "direct" (default) or "deferred"
//! assignment_symbol = ":"
//! comment_symbol = ";"
//! section_symbols = ["<", ">"]
//! variable_symbols = ["${", "}"]
//! variable_section = "VARS"
//! ```
//!
//! Every symbol field is optional and falls back to the stock dialect.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::application::deferred::DeferredStore;
use crate::application::direct::DirectStore;
use crate::application::ConfigStore;
use crate::domain::error::ConfigError;
use crate::domain::symbols::Symbols;
use crate::infrastructure::storage::FileStorage;

/// Which store strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Read and write the file on every call.
    #[default]
    Direct,
    /// Load once into a structured view; write on `save`.
    Deferred,
}

/// Everything needed to open a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerOptions {
    /// Path to the configuration document.
    pub file: PathBuf,
    /// Restricts every operation to this section.
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(flatten)]
    pub symbols: Symbols,
}

impl ManagerOptions {
    /// Direct mode, no scope, default symbols.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            section: None,
            mode: Mode::Direct,
            symbols: Symbols::default(),
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_symbols(mut self, symbols: Symbols) -> Self {
        self.symbols = symbols;
        self
    }

    /// Parses options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Options`] if the TOML is malformed or `file`
    /// is missing.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Builds a direct-mode store over the configured file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSymbols`] for unusable symbols.
    pub fn open_direct(&self) -> Result<DirectStore<FileStorage>, ConfigError> {
        DirectStore::new(
            FileStorage::new(&self.file),
            self.symbols.clone(),
            self.section.clone(),
        )
    }

    /// Loads a deferred-mode store from the configured file.
    ///
    /// # Errors
    ///
    /// Returns symbol, I/O and parse errors from the initial load.
    pub fn open_deferred(&self) -> Result<DeferredStore<FileStorage>, ConfigError> {
        DeferredStore::load(
            FileStorage::new(&self.file),
            self.symbols.clone(),
            self.section.clone(),
        )
    }
}

/// Reads options from a TOML file.
///
/// A relative `file` is resolved against the options file's directory.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Options`] if it cannot be parsed.
pub fn load_options(path: &Path) -> Result<ManagerOptions, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut options = ManagerOptions::from_toml_str(&text)?;
    if options.file.is_relative() {
        if let Some(dir) = path.parent() {
            options.file = dir.join(&options.file);
        }
    }
    debug!("loaded options from {}: {:?}", path.display(), options);
    Ok(options)
}

/// Opens the store strategy selected by `options.mode`.
///
/// # Errors
///
/// Propagates the errors of [`ManagerOptions::open_direct`] or
/// [`ManagerOptions::open_deferred`].
pub fn open_store(options: &ManagerOptions) -> Result<Box<dyn ConfigStore>, ConfigError> {
    Ok(match options.mode {
        Mode::Direct => Box::new(options.open_direct()?),
        Mode::Deferred => Box::new(options.open_deferred()?),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
