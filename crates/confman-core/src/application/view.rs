//! In-memory structured view used by deferred mode.
//!
//! The view is a two-level ordered map, section name to key to entry.  Every
//! section and entry carries a [`PendingOp`] tag that records what the next
//! save must do with it.
//!
//! ```text
//! StructuredView
//!  ├─ "Server"  (PendingOp::None)
//!  │    ├─ "url"   = "http://%host%/api"  (None)
//!  │    └─ "port"  = "8080"               (New)
//!  └─ "Legacy"  (Delete)                  <- hidden, kept until save
//! ```
//!
//! Nodes tagged [`PendingOp::Delete`] stay in the maps so the save pass can
//! find the lines to remove, but every lookup and enumeration skips them.
//! Iteration follows declaration order: load order first, then creation
//! order.
//!
//! The variable table lives beside the sections and is never tagged.  Reads
//! pass it explicitly to the resolver.

use indexmap::IndexMap;

use crate::domain::error::ConfigError;
use crate::domain::line::{classify, split_entry, LineKind};
use crate::domain::symbols::Symbols;
use crate::domain::variables::{resolve, VariableTable};

/// What the next save must do with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingOp {
    /// Matches storage.
    #[default]
    None,
    /// Not yet in storage.
    New,
    /// In storage with a different value.
    Update,
    /// In storage; to be removed.
    Delete,
}

/// A key's value plus its pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNode {
    value: String,
    op: PendingOp,
}

impl EntryNode {
    fn new(value: impl Into<String>, op: PendingOp) -> Self {
        Self {
            value: value.into(),
            op,
        }
    }

    /// The stored text, placeholders included.
    pub fn raw_value(&self) -> &str {
        &self.value
    }

    /// The value with placeholders resolved against `variables`.
    pub fn resolved(&self, variables: &VariableTable, symbols: &Symbols) -> String {
        resolve(&self.value, variables, &symbols.variable_symbols)
    }

    pub fn pending(&self) -> PendingOp {
        self.op
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.op == PendingOp::Delete
    }
}

/// One section: an ordered map of entries plus the section's own tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionNode {
    entries: IndexMap<String, EntryNode>,
    op: PendingOp,
}

impl SectionNode {
    fn with_op(op: PendingOp) -> Self {
        Self {
            entries: IndexMap::new(),
            op,
        }
    }

    pub fn pending(&self) -> PendingOp {
        self.op
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.op == PendingOp::Delete
    }

    /// Live keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|(key, _)| key)
    }

    /// Live entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &EntryNode)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_pending_deletion())
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Looks up a live entry.
    pub fn entry(&self, key: &str) -> Option<&EntryNode> {
        self.entries.get(key).filter(|entry| !entry.is_pending_deletion())
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry including those pending deletion.
    pub(crate) fn all_entries(&self) -> &IndexMap<String, EntryNode> {
        &self.entries
    }

    fn set(&mut self, key: &str, value: &str) -> PendingOp {
        let op = match self.entries.get(key).map(EntryNode::pending) {
            None | Some(PendingOp::New) => PendingOp::New,
            Some(_) => PendingOp::Update,
        };
        self.entries.insert(key.to_string(), EntryNode::new(value, op));
        op
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.get(key).map(EntryNode::pending) {
            None | Some(PendingOp::Delete) => false,
            Some(PendingOp::New) => {
                self.entries.shift_remove(key);
                true
            }
            Some(_) => {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.op = PendingOp::Delete;
                }
                true
            }
        }
    }
}

/// Sections and variables of one document, with pending edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredView {
    sections: IndexMap<String, SectionNode>,
    variables: VariableTable,
}

/// Where key-value lines go while loading.
enum LoadTarget<'a> {
    Outside,
    Variables,
    Section(&'a str),
}

impl StructuredView {
    /// Builds a view from document lines.
    ///
    /// Variables-section lines fill the variable table.  Other key-value
    /// lines become untagged entries; the first definition of a key wins and
    /// repeated headers merge into one node.  With `scope` set, entries of
    /// every other ordinary section are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedLine`] for a loaded line without an
    /// assignment symbol.
    pub fn load(lines: &[String], symbols: &Symbols, scope: Option<&str>) -> Result<Self, ConfigError> {
        let mut view = Self::default();
        let mut target = LoadTarget::Outside;

        for line in lines {
            match classify(line, symbols) {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::SectionHeader(name) => {
                    target = if symbols.is_variable_section(name) {
                        LoadTarget::Variables
                    } else if scope.is_some_and(|s| s != name) {
                        LoadTarget::Outside
                    } else {
                        view.sections.entry(name.to_string()).or_default();
                        LoadTarget::Section(name)
                    };
                }
                LineKind::KeyValue => match target {
                    LoadTarget::Outside => {}
                    LoadTarget::Variables => {
                        let (name, value) = split_entry(line, symbols)?;
                        view.variables.insert(name.to_string(), value.to_string());
                    }
                    LoadTarget::Section(section) => {
                        let (key, value) = split_entry(line, symbols)?;
                        if let Some(node) = view.sections.get_mut(section) {
                            node.entries
                                .entry(key.to_string())
                                .or_insert_with(|| EntryNode::new(value, PendingOp::None));
                        }
                    }
                },
            }
        }

        Ok(view)
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Live section names in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(|(_, node)| !node.is_pending_deletion())
            .map(|(name, _)| name.as_str())
    }

    /// Looks up a live section.
    pub fn section(&self, name: &str) -> Option<&SectionNode> {
        self.sections.get(name).filter(|node| !node.is_pending_deletion())
    }

    /// Looks up a live entry.
    pub fn entry(&self, section: &str, key: &str) -> Option<&EntryNode> {
        self.section(section).and_then(|node| node.entry(key))
    }

    /// Resolved value of a live entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] if the section or key is absent
    /// or pending deletion.
    pub fn value(&self, section: &str, key: &str, symbols: &Symbols) -> Result<String, ConfigError> {
        self.entry(section, key)
            .map(|entry| entry.resolved(&self.variables, symbols))
            .ok_or_else(|| ConfigError::key_not_found(section, key))
    }

    /// Number of tagged sections and entries.
    pub fn pending_changes(&self) -> usize {
        self.sections
            .values()
            .map(|node| {
                let own = usize::from(node.op != PendingOp::None);
                own + node.entries.values().filter(|e| e.op != PendingOp::None).count()
            })
            .sum()
    }

    /// Every section including those pending deletion.
    pub(crate) fn all_sections(&self) -> &IndexMap<String, SectionNode> {
        &self.sections
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Sets `key` in `section`, creating either as needed.
    ///
    /// Returns the resulting tag of the entry.
    pub(crate) fn set(&mut self, section: &str, key: &str, value: &str) -> Result<PendingOp, ConfigError> {
        match self.sections.get(section) {
            Some(node) if node.is_pending_deletion() => {
                Err(ConfigError::PendingDeletion(section.to_string()))
            }
            Some(_) => Ok(self.section_mut(section).set(key, value)),
            None => {
                let mut node = SectionNode::with_op(PendingOp::New);
                let op = node.set(key, value);
                self.sections.insert(section.to_string(), node);
                Ok(op)
            }
        }
    }

    /// The `new` operation: fails if the key is live.
    pub(crate) fn insert_new(&mut self, section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        if self.entry(section, key).is_some() {
            return Err(ConfigError::key_exists(section, key));
        }
        self.set(section, key, value).map(|_| ())
    }

    /// The `update` operation: fails unless the key is live.
    pub(crate) fn replace(&mut self, section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        if self.entry(section, key).is_none() {
            return Err(ConfigError::key_not_found(section, key));
        }
        self.set(section, key, value).map(|_| ())
    }

    /// The `delete` operation: fails unless the key is live.
    pub(crate) fn remove(&mut self, section: &str, key: &str) -> Result<(), ConfigError> {
        let removed = match self.sections.get_mut(section) {
            Some(node) if !node.is_pending_deletion() => node.remove(key),
            _ => false,
        };
        if removed {
            Ok(())
        } else {
            Err(ConfigError::key_not_found(section, key))
        }
    }

    pub(crate) fn create_section(&mut self, name: &str) -> Result<(), ConfigError> {
        match self.sections.get(name) {
            Some(node) if node.is_pending_deletion() => Err(ConfigError::PendingDeletion(name.to_string())),
            Some(_) => Err(ConfigError::SectionExists(name.to_string())),
            None => {
                self.sections
                    .insert(name.to_string(), SectionNode::with_op(PendingOp::New));
                Ok(())
            }
        }
    }

    pub(crate) fn delete_section(&mut self, name: &str) -> Result<(), ConfigError> {
        match self.sections.get(name).map(SectionNode::pending) {
            None | Some(PendingOp::Delete) => Err(ConfigError::SectionNotFound(name.to_string())),
            Some(PendingOp::New) => {
                self.sections.shift_remove(name);
                Ok(())
            }
            Some(_) => {
                self.section_mut(name).op = PendingOp::Delete;
                Ok(())
            }
        }
    }

    /// Marks the view as matching storage: drops deleted nodes, clears every
    /// tag, and installs the variable table read back from storage.
    pub(crate) fn commit(&mut self, variables: VariableTable) {
        self.sections.retain(|_, node| !node.is_pending_deletion());
        for node in self.sections.values_mut() {
            node.op = PendingOp::None;
            node.entries.retain(|_, entry| !entry.is_pending_deletion());
            for entry in node.entries.values_mut() {
                entry.op = PendingOp::None;
            }
        }
        self.variables = variables;
    }

    fn section_mut(&mut self, name: &str) -> &mut SectionNode {
        self.sections.entry(name.to_string()).or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
