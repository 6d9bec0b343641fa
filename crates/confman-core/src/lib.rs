//! # confman-core
//!
//! Reads and edits section-structured configuration files in which a
//! reserved section defines variables that other values can reference.
//!
//! ```text
//! [CONFIG_ARGS]
//! host = localhost
//!
//! [Server]
//! url = http://%host%/api      # get("Server", "url") -> "http://localhost/api"
//! ```
//!
//! # Architecture overview
//!
//! - **`domain`** – Pure rules with no I/O: the line classifier, the
//!   key/value splitter, the placeholder resolver, the configurable
//!   [`Symbols`], and the [`ConfigError`] taxonomy.
//!
//! - **`application`** – The two store strategies behind [`ConfigStore`]:
//!   [`DirectStore`] rescans and rewrites the document on every call;
//!   [`DeferredStore`] edits a [`StructuredView`] in memory and reconciles
//!   it with storage on `save`.
//!
//! - **`infrastructure`** – [`FileStorage`] / [`MemoryStorage`] behind the
//!   [`DocumentStorage`] seam, and [`ManagerOptions`] loaded from TOML.
//!
//! # Example
//!
//! ```rust
//! use confman_core::{ConfigStore, DirectStore, MemoryStorage, Symbols};
//!
//! let text = "[CONFIG_ARGS]\nhost = localhost\n\n[Server]\nurl = http://%host%/api\n";
//! let mut store = DirectStore::new(MemoryStorage::new(text), Symbols::default(), None).unwrap();
//!
//! assert_eq!(store.get(Some("Server"), "url").unwrap(), "http://localhost/api");
//! store.create(Some("Server"), "port", "8080").unwrap();
//! assert_eq!(store.get(Some("Server"), "port").unwrap(), "8080");
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the most-used types at the crate root so callers can write
// `confman_core::DirectStore` instead of `confman_core::application::direct::DirectStore`.
pub use application::deferred::DeferredStore;
pub use application::direct::{DirectStore, Operation};
pub use application::view::{EntryNode, PendingOp, SectionNode, StructuredView};
pub use application::ConfigStore;
pub use domain::error::ConfigError;
pub use domain::symbols::{Delimiters, Symbols};
pub use domain::variables::{resolve, VariableTable};
pub use infrastructure::options::{load_options, open_store, ManagerOptions, Mode};
pub use infrastructure::storage::{DocumentStorage, FileStorage, MemoryStorage};
