//! INI file configuration source.

use crate::error::{ConfigError, ConfigResult};
use crate::parser::{IniDocument, ROOT_SECTION};
use crate::source::ConfigSource;
use crate::value::ConfigValue;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// The in-memory document shared by every section view of one file.
#[derive(Debug)]
struct IniStore {
    document: IniDocument,
    /// Backing file; `None` when there is nothing to persist to
    path: Option<PathBuf>,
    dirty: bool,
}

/// File-based configuration source backed by an INI file.
///
/// Keys of the `[__root__]` section are top-level keys; every other section
/// is one subsection, and sections do not nest further. All values are read
/// and written as text. Section views share one in-memory document, so a
/// write through any view is visible to all of them and is persisted by
/// [`save`](ConfigSource::save) on the root view.
pub struct FileSource {
    identifier: String,
    store: Rc<RefCell<IniStore>>,
    section: String,
    writable: bool,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.borrow();
        f.debug_struct("FileSource")
            .field("identifier", &self.identifier)
            .field("path", &store.path)
            .field("section", &self.section)
            .field("writable", &self.writable)
            .field("dirty", &store.dirty)
            .finish()
    }
}

impl FileSource {
    /// Opens an INI file.
    ///
    /// A missing file is not an error: it yields an empty source whose
    /// `save()` does nothing, and a warning is logged.
    ///
    /// # Errors
    /// * `ConfigError::Io` - If the file exists but cannot be read
    /// * `ConfigError::Parse` - If the file content cannot be parsed
    pub fn open<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "INI file does not exist");
            return Ok(Self::from_document(IniDocument::new(), None));
        }
        Self::load(path)
    }

    /// Opens an INI file that must exist.
    ///
    /// # Errors
    /// * `ConfigError::SourceUnavailable` - If the file does not exist
    /// * `ConfigError::Io` - If the file cannot be read
    /// * `ConfigError::Parse` - If the file content cannot be parsed
    pub fn open_required<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::SourceUnavailable {
                path: path.to_path_buf(),
            });
        }
        Self::load(path)
    }

    /// Parses INI text without a backing file.
    pub fn from_text(content: &str) -> ConfigResult<Self> {
        let document = IniDocument::parse(content, "<text>")?;
        Ok(Self::from_document(document, None))
    }

    fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let document = IniDocument::parse(&content, &path.display().to_string())?;
        debug!(path = %path.display(), "loaded INI file");
        Ok(Self::from_document(document, Some(path.to_path_buf())))
    }

    fn from_document(document: IniDocument, path: Option<PathBuf>) -> Self {
        Self {
            identifier: "inifile".to_string(),
            store: Rc::new(RefCell::new(IniStore {
                document,
                path,
                dirty: false,
            })),
            section: ROOT_SECTION.to_string(),
            writable: true,
        }
    }

    /// Overrides the identifier used for write-back addressing.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Excludes this file from implicit write-back.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Returns the backing file path, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.store.borrow().path.clone()
    }

    /// Returns the section this view covers.
    pub fn section(&self) -> &str {
        &self.section
    }
}

impl ConfigSource for FileSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn has(&self, key: &str) -> bool {
        self.store.borrow().document.get(&self.section, key).is_some()
    }

    fn get(&self, key: &str) -> ConfigResult<ConfigValue> {
        self.store
            .borrow()
            .document
            .get(&self.section, key)
            .map(ConfigValue::from)
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    /// Stores the text form of `value`.
    ///
    /// # Errors
    /// * `ConfigError::InvalidValue` - If the text holds a line break or
    ///   leading or trailing whitespace, which a `key = value` line cannot
    ///   carry back unchanged
    fn set(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        let text = value.to_string();
        if text.contains(['\n', '\r']) {
            return Err(ConfigError::invalid_value(
                key,
                "line breaks cannot be stored in an INI value",
            ));
        }
        if text.trim() != text {
            return Err(ConfigError::invalid_value(
                key,
                "leading or trailing whitespace cannot be stored in an INI value",
            ));
        }

        let mut store = self.store.borrow_mut();
        store.document.set(&self.section, key, text);
        store.dirty = true;
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.store.borrow().document.keys(&self.section)
    }

    fn subsections(&self) -> Vec<String> {
        if !self.is_root() {
            return Vec::new();
        }
        self.store
            .borrow()
            .document
            .section_names()
            .filter(|name| *name != ROOT_SECTION)
            .map(str::to_string)
            .collect()
    }

    fn subsection(&self, name: &str) -> Option<Box<dyn ConfigSource>> {
        if !self.is_root() {
            return None;
        }
        Some(Box::new(Self {
            identifier: self.identifier.clone(),
            store: Rc::clone(&self.store),
            section: name.to_string(),
            writable: self.writable,
        }))
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn is_root(&self) -> bool {
        self.section == ROOT_SECTION
    }

    fn is_dirty(&self) -> bool {
        self.store.borrow().dirty
    }

    fn save(&mut self) -> ConfigResult<()> {
        if !self.is_root() {
            return Err(ConfigError::precondition(format!(
                "save() called on section view [{}]; only the root view may persist",
                self.section
            )));
        }

        let mut store = self.store.borrow_mut();
        let Some(path) = store.path.clone() else {
            return Ok(());
        };
        fs::write(&path, store.document.serialize())?;
        store.dirty = false;
        debug!(path = %path.display(), "saved INI file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FERENDA: &str = "
[__root__]
datadir = mydata
processes = 4
loglevel = INFO

[mymodule]
loglevel = DEBUG
lastrun = 2012-09-18 15:41:00
";

    fn create_test_ini_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
        let path = dir.path().join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_source_values_are_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_ini_file(&temp_dir, "ferenda.ini", FERENDA);
        let source = FileSource::open(&path).unwrap();

        assert_eq!(source.identifier(), "inifile");
        assert_eq!(source.path(), Some(path));
        assert_eq!(source.get("processes").unwrap(), ConfigValue::from("4"));
        assert!(!source.typed("processes"));
        assert_eq!(source.keys(), vec!["datadir", "processes", "loglevel"]);
        assert_eq!(source.subsections(), vec!["mymodule"]);
        assert!(source.get("lastrun").unwrap_err().is_key_not_found());
    }

    #[test]
    fn test_section_views() {
        let source = FileSource::from_text(FERENDA).unwrap();
        let module = source.subsection("mymodule").unwrap();

        assert!(!module.is_root());
        assert_eq!(module.get("loglevel").unwrap(), ConfigValue::from("DEBUG"));
        assert!(!module.has("datadir"));
        assert!(module.subsections().is_empty());
        assert!(module.subsection("deeper").is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = FileSource::open(temp_dir.path().join("nonexistent.ini")).unwrap();

        assert!(source.keys().is_empty());
        assert!(source.subsections().is_empty());
        assert!(!source.has("datadir"));
        assert!(source.path().is_none());
        source.save().unwrap();
        assert!(!temp_dir.path().join("nonexistent.ini").exists());
    }

    #[test]
    fn test_open_required_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = FileSource::open_required(temp_dir.path().join("nonexistent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_invalid_ini() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_ini_file(&temp_dir, "bad.ini", "[mymodule]\nnot a pair\n");
        let err = FileSource::open(&path).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_set_marks_dirty_and_save_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_ini_file(&temp_dir, "ferenda.ini", FERENDA);
        let mut source = FileSource::open(&path).unwrap();
        let mut module = source.subsection("mymodule").unwrap();

        module.set("loglevel", ConfigValue::from("ERROR")).unwrap();
        assert!(source.is_dirty());
        assert!(module.save().unwrap_err().is_precondition());

        source.save().unwrap();
        assert!(!source.is_dirty());

        let reread = FileSource::open(&path).unwrap();
        let module = reread.subsection("mymodule").unwrap();
        assert_eq!(module.get("loglevel").unwrap(), ConfigValue::from("ERROR"));
        assert_eq!(
            module.get("lastrun").unwrap(),
            ConfigValue::from("2012-09-18 15:41:00")
        );
    }

    #[test]
    fn test_new_section_through_view() {
        let mut source = FileSource::from_text(FERENDA).unwrap();
        let mut extra = source.subsection("extra").unwrap();
        assert!(extra.keys().is_empty());

        extra.set("processes", ConfigValue::Integer(8)).unwrap();
        assert_eq!(source.subsections(), vec!["mymodule", "extra"]);
        assert_eq!(extra.get("processes").unwrap(), ConfigValue::from("8"));

        // No backing file: saving is a no-op
        source.save().unwrap();
    }

    #[test]
    fn test_set_rejects_text_that_cannot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_ini_file(&temp_dir, "ferenda.ini", FERENDA);
        let mut source = FileSource::open(&path).unwrap();

        let err = source
            .set("datadir", ConfigValue::from("line1\n[evil]\nx = 1"))
            .unwrap_err();
        assert!(err.is_invalid_value());
        assert!(source
            .set("datadir", ConfigValue::from("a\rb"))
            .unwrap_err()
            .is_invalid_value());
        assert!(source
            .set("datadir", ConfigValue::from("  padded  "))
            .unwrap_err()
            .is_invalid_value());
        assert!(source
            .set("jsfiles", ConfigValue::from(vec!["a\nb"]))
            .is_ok());

        // Rejected writes leave the document untouched
        assert_eq!(source.get("datadir").unwrap(), ConfigValue::from("mydata"));
        source.save().unwrap();
        let reread = FileSource::open(&path).unwrap();
        assert_eq!(reread.subsections(), vec!["mymodule"]);
        assert_eq!(reread.get("datadir").unwrap(), ConfigValue::from("mydata"));
    }

    #[test]
    fn test_read_only() {
        let source = FileSource::from_text(FERENDA).unwrap().read_only();
        assert!(!source.writable());
        assert!(!source.subsection("mymodule").unwrap().writable());
    }
}
