//! Deferred mode: edit a [`StructuredView`] in memory, write on `save`.
//!
//! ```text
//! load()  ── read once ──►  StructuredView  ◄── get / set / remove / sections
//!                                │
//! save()  ── read again ─► reconcile() ── write once ──► commit (tags reset)
//! ```
//!
//! Reads never touch storage after load.  `save` re-reads the document so
//! edits made by other writers since load are preserved (see
//! [`crate::application::reconcile`] for the conflict rules).

use tracing::{debug, info};

use crate::application::direct::collect_variables;
use crate::application::reconcile::reconcile;
use crate::application::view::{PendingOp, SectionNode, StructuredView};
use crate::application::{target_section, ConfigStore};
use crate::domain::error::ConfigError;
use crate::domain::symbols::Symbols;
use crate::domain::variables::VariableTable;
use crate::infrastructure::storage::DocumentStorage;

/// Deferred-mode store over any [`DocumentStorage`].
#[derive(Debug)]
pub struct DeferredStore<S> {
    storage: S,
    symbols: Symbols,
    scope: Option<String>,
    view: StructuredView,
}

impl<S: DocumentStorage> DeferredStore<S> {
    /// Reads the document and builds the view.
    ///
    /// With `scope` set, only that section is materialized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSymbols`], storage errors, or
    /// [`ConfigError::MalformedLine`] from the load pass.
    pub fn load(storage: S, symbols: Symbols, scope: Option<String>) -> Result<Self, ConfigError> {
        symbols.validate()?;
        let lines = storage.read_lines()?;
        let view = StructuredView::load(&lines, &symbols, scope.as_deref())?;
        debug!(
            "loaded view: {} sections, {} variables",
            view.sections().count(),
            view.variables().len()
        );
        Ok(Self {
            storage,
            symbols,
            scope,
            view,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    pub fn view(&self) -> &StructuredView {
        &self.view
    }

    pub fn variables(&self) -> &VariableTable {
        self.view.variables()
    }

    /// Live section names in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.view.sections()
    }

    /// Looks up a live section.
    pub fn section(&self, name: &str) -> Option<&SectionNode> {
        self.view.section(name)
    }

    /// Live keys of `section` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns scope errors or [`ConfigError::SectionNotFound`].
    pub fn keys(&self, section: Option<&str>) -> Result<Vec<&str>, ConfigError> {
        let name = self.target(section)?;
        self.view
            .section(name)
            .map(|node| node.keys().collect())
            .ok_or_else(|| ConfigError::SectionNotFound(name.to_string()))
    }

    /// Dictionary-style assignment: creates the entry (and section) if
    /// missing, otherwise updates it.
    ///
    /// # Errors
    ///
    /// Returns scope errors, [`ConfigError::ReservedSection`], or
    /// [`ConfigError::PendingDeletion`] for a section awaiting deletion.
    pub fn set(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<PendingOp, ConfigError> {
        let name = self.writable(section, key, value)?;
        self.view.set(&name, key, value)
    }

    /// Creates an empty section.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SectionExists`] when the section is live,
    /// [`ConfigError::PendingDeletion`] when it awaits deletion.
    pub fn create_section(&mut self, name: &str) -> Result<(), ConfigError> {
        let name = self.editable(Some(name))?;
        self.check_new_section(&name)?;
        self.view.create_section(&name)
    }

    /// Marks a section and all its entries for deletion.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SectionNotFound`] when the section is not live.
    pub fn delete_section(&mut self, name: &str) -> Result<(), ConfigError> {
        let name = self.editable(Some(name))?;
        self.view.delete_section(&name)
    }

    /// Number of tagged sections and entries waiting for `save`.
    pub fn pending_changes(&self) -> usize {
        self.view.pending_changes()
    }

    /// Writes every pending change to storage.
    ///
    /// Returns the number of changes written.  Nothing is read or written
    /// when there are no pending changes.
    ///
    /// # Errors
    ///
    /// Storage errors, the conflicts described in
    /// [`crate::application::reconcile`], and [`ConfigError::MalformedLine`]
    /// for a broken variable line in the document being written.  On error
    /// nothing is written and the view keeps its tags.
    pub fn save(&mut self) -> Result<usize, ConfigError> {
        let pending = self.view.pending_changes();
        if pending == 0 {
            debug!("save: nothing to write");
            return Ok(0);
        }

        let lines = self.storage.read_lines()?;
        let updated = reconcile(&lines, &self.view, &self.symbols)?;
        let variables = collect_variables(&updated, &self.symbols)?;
        self.storage.write_lines(&updated)?;

        self.view.commit(variables);
        info!("save: wrote {pending} pending changes");
        Ok(pending)
    }

    /// Discards pending changes and rebuilds the view from storage.
    ///
    /// # Errors
    ///
    /// Storage errors or [`ConfigError::MalformedLine`].
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let lines = self.storage.read_lines()?;
        self.view = StructuredView::load(&lines, &self.symbols, self.scope.as_deref())?;
        Ok(())
    }

    fn target<'a>(&'a self, section: Option<&'a str>) -> Result<&'a str, ConfigError> {
        target_section(self.scope.as_deref(), section)
    }

    /// Like [`Self::target`] but also rejects the variables section.
    fn editable(&self, section: Option<&str>) -> Result<String, ConfigError> {
        let name = target_section(self.scope.as_deref(), section)?;
        if self.symbols.is_variable_section(name) {
            return Err(ConfigError::ReservedSection(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Like [`Self::editable`] but also checks that the entry, and the
    /// section if it has to be created, can be written and read back.
    fn writable(&self, section: Option<&str>, key: &str, value: &str) -> Result<String, ConfigError> {
        let name = self.editable(section)?;
        self.symbols.check_entry(key, value)?;
        self.check_new_section(&name)?;
        Ok(name)
    }

    fn check_new_section(&self, name: &str) -> Result<(), ConfigError> {
        if self.view.all_sections().contains_key(name) {
            return Ok(());
        }
        self.symbols.check_section_name(name)
    }
}

impl<S: DocumentStorage> ConfigStore for DeferredStore<S> {
    fn get(&self, section: Option<&str>, key: &str) -> Result<String, ConfigError> {
        let name = self.target(section)?;
        if self.symbols.is_variable_section(name) {
            return Err(ConfigError::ReservedSection(name.to_string()));
        }
        self.view.value(name, key, &self.symbols)
    }

    fn create(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError> {
        let name = self.writable(section, key, value)?;
        self.view.insert_new(&name, key, value)
    }

    fn update(&mut self, section: Option<&str>, key: &str, value: &str) -> Result<(), ConfigError> {
        let name = self.writable(section, key, value)?;
        self.view.replace(&name, key, value)
    }

    fn delete(&mut self, section: Option<&str>, key: &str) -> Result<(), ConfigError> {
        let name = self.editable(section)?;
        self.view.remove(&name, key)
    }

    fn save(&mut self) -> Result<usize, ConfigError> {
        DeferredStore::save(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::{MemoryStorage, MockDocumentStorage};

    const DOC: &str = "[CONFIG_ARGS]\nhost = localhost\n\n[Server]\nurl = http://%host%/api\n";

    fn store(text: &str) -> DeferredStore<MemoryStorage> {
        DeferredStore::load(MemoryStorage::new(text), Symbols::default(), None).unwrap()
    }

    #[test]
    fn test_get_resolves_from_view() {
        let s = store(DOC);
        assert_eq!(s.get(Some("Server"), "url").unwrap(), "http://localhost/api");
    }

    #[test]
    fn test_mutations_do_not_touch_storage_until_save() {
        // Arrange
        let mut s = store(DOC);

        // Act
        s.create(Some("Server"), "port", "8080").unwrap();
        s.update(Some("Server"), "url", "http://%host%:8080/").unwrap();

        // Assert
        assert_eq!(s.storage().text(), DOC);
        assert_eq!(s.storage().write_count(), 0);
        assert_eq!(s.get(Some("Server"), "port").unwrap(), "8080");
        assert_eq!(s.get(Some("Server"), "url").unwrap(), "http://localhost:8080/");
        assert_eq!(s.pending_changes(), 2);
    }

    #[test]
    fn test_save_writes_once_and_resets_tags() {
        // Arrange
        let mut s = store(DOC);
        s.create(Some("Server"), "port", "8080").unwrap();

        // Act
        let written = s.save().unwrap();

        // Assert
        assert_eq!(written, 1);
        assert_eq!(s.storage().write_count(), 1);
        assert_eq!(s.pending_changes(), 0);
        assert_eq!(
            s.storage().text(),
            "[CONFIG_ARGS]\nhost = localhost\n\n[Server]\nurl = http://%host%/api\nport = 8080\n"
        );
        assert_eq!(
            s.section("Server").unwrap().entry("port").unwrap().pending(),
            PendingOp::None
        );
    }

    #[test]
    fn test_save_without_changes_does_not_touch_storage() {
        let mut mock = MockDocumentStorage::new();
        mock.expect_read_lines()
            .times(1)
            .returning(|| Ok(vec!["[A]".to_string(), "a = 1".to_string()]));
        mock.expect_write_lines().never();
        let mut s = DeferredStore::load(mock, Symbols::default(), None).unwrap();

        assert_eq!(s.save().unwrap(), 0);
    }

    #[test]
    fn test_failed_save_keeps_tags_and_storage() {
        // Arrange
        let mut s = store(DOC);
        s.create(Some("Server"), "port", "8080").unwrap();
        s.storage()
            .replace_text(format!("{DOC}port = 1\n"));

        // Act
        let err = s.save().unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::KeyAlreadyExists { .. }));
        assert_eq!(s.storage().write_count(), 0);
        assert_eq!(s.pending_changes(), 1);
    }

    #[test]
    fn test_save_reloads_variables_written_by_others() {
        let mut s = store(DOC);
        s.create(Some("Server"), "port", "8080").unwrap();
        s.storage()
            .replace_text(DOC.replace("host = localhost", "host = example.org"));

        s.save().unwrap();

        assert_eq!(s.get(Some("Server"), "url").unwrap(), "http://example.org/api");
    }

    #[test]
    fn test_scoped_store_enforces_scope() {
        let mut s = DeferredStore::load(
            MemoryStorage::new(DOC),
            Symbols::default(),
            Some("Server".to_string()),
        )
        .unwrap();
        assert_eq!(s.get(None, "url").unwrap(), "http://localhost/api");
        assert!(matches!(
            s.create_section("Other"),
            Err(ConfigError::CrossSection { .. })
        ));
        assert!(matches!(
            s.set(Some("Other"), "k", "v"),
            Err(ConfigError::CrossSection { .. })
        ));
    }

    #[test]
    fn test_variables_section_is_not_editable() {
        let mut s = store(DOC);
        assert!(matches!(
            s.set(Some("CONFIG_ARGS"), "host", "x"),
            Err(ConfigError::ReservedSection(_))
        ));
        assert!(matches!(
            s.create_section("CONFIG_ARGS"),
            Err(ConfigError::ReservedSection(_))
        ));
    }

    #[test]
    fn test_keys_lists_live_entries() {
        let mut s = store("[A]\na = 1\nb = 2\n");
        s.delete(Some("A"), "a").unwrap();
        s.set(Some("A"), "c", "3").unwrap();
        assert_eq!(s.keys(Some("A")).unwrap(), vec!["b", "c"]);
        assert!(matches!(
            s.keys(Some("Z")),
            Err(ConfigError::SectionNotFound(_))
        ));
    }

    #[test]
    fn test_reload_discards_pending_changes() {
        let mut s = store(DOC);
        s.delete_section("Server").unwrap();
        s.reload().unwrap();
        assert_eq!(s.pending_changes(), 0);
        assert_eq!(s.sections().collect::<Vec<_>>(), vec!["Server"]);
    }

    #[test]
    fn test_malformed_variable_added_externally_fails_save_without_writing() {
        // Arrange
        let mut s = store(DOC);
        s.create(Some("Server"), "port", "8080").unwrap();
        s.storage()
            .replace_text(DOC.replace("host = localhost\n", "host = localhost\nbroken\n"));

        // Act
        let err = s.save().unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::MalformedLine { .. }));
        assert_eq!(s.storage().write_count(), 0);
        assert!(!s.storage().text().contains("port = 8080"));
        assert_eq!(s.pending_changes(), 1);
    }

    #[test]
    fn test_save_succeeds_once_external_damage_is_repaired() {
        // Arrange
        let mut s = store(DOC);
        s.create(Some("Server"), "port", "8080").unwrap();
        s.storage()
            .replace_text(DOC.replace("host = localhost\n", "host = localhost\nbroken\n"));
        assert!(s.save().is_err());

        // Act
        s.storage().replace_text(DOC);
        let written = s.save().unwrap();

        // Assert
        assert_eq!(written, 1);
        assert_eq!(s.storage().write_count(), 1);
        assert!(s.storage().text().ends_with("port = 8080\n"));
    }

    #[test]
    fn test_unwritable_entries_are_rejected_in_view() {
        let mut s = store(DOC);
        assert!(matches!(
            s.update(Some("Server"), "url", "x\n[Evil]\nk = v"),
            Err(ConfigError::InvalidEntry { .. })
        ));
        assert!(matches!(
            s.create(Some("Server"), "#k", "v"),
            Err(ConfigError::InvalidEntry { .. })
        ));
        assert!(matches!(
            s.set(Some("Server"), "a=b", "v"),
            Err(ConfigError::InvalidEntry { .. })
        ));
        assert!(matches!(
            s.set(Some("New]\n[X"), "k", "v"),
            Err(ConfigError::InvalidEntry { .. })
        ));
        assert!(matches!(
            s.create_section(""),
            Err(ConfigError::InvalidEntry { .. })
        ));
        assert_eq!(s.pending_changes(), 0);
    }
}
