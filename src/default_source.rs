//! In-memory defaults source.

use crate::coerce::TypeHint;
use crate::error::{ConfigError, ConfigResult};
use crate::source::{ConfigSource, DEFAULTS_ID};
use crate::value::{ConfigValue, ValueKind};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A declared default: its type tag and its value (`Null` if none).
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultEntry {
    pub hint: Option<TypeHint>,
    pub default: ConfigValue,
}

impl DefaultEntry {
    /// An entry whose type is inferred from the literal value.
    pub fn literal(value: ConfigValue) -> Self {
        Self {
            hint: TypeHint::for_default(&value),
            default: value,
        }
    }

    /// An entry with a declared type and no value.
    pub fn declared(kind: ValueKind) -> Self {
        Self {
            hint: Some(TypeHint::new(kind)),
            default: ConfigValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DefaultItem {
    Entry(DefaultEntry),
    Section(DefaultsTable),
}

type DefaultsTable = IndexMap<String, DefaultItem>;

fn table_from_mapping(mapping: IndexMap<String, ConfigValue>) -> DefaultsTable {
    mapping
        .into_iter()
        .map(|(key, value)| match value {
            ConfigValue::Mapping(nested) => (key, DefaultItem::Section(table_from_mapping(nested))),
            other => (key, DefaultItem::Entry(DefaultEntry::literal(other))),
        })
        .collect()
}

/// Configuration source holding hard-coded defaults.
///
/// Every entry carries a type tag decided when the entry is declared, which
/// makes this the typed source that drives coercion of text from other
/// sources. Nested mappings become subsections of unlimited depth.
///
/// # Example
/// ```
/// use stratacfg::{ConfigSource, Defaults, ValueKind};
///
/// let defaults = Defaults::new()
///     .value("home", "mydata")
///     .value("processes", 4i64)
///     .declare("lastrun", ValueKind::DateTime)
///     .section("mymodule", Defaults::new().value("force", false));
///
/// assert_eq!(defaults.keys(), vec!["home", "processes", "lastrun"]);
/// assert_eq!(defaults.subsections(), vec!["mymodule"]);
/// ```
#[derive(Debug, Clone)]
pub struct Defaults {
    identifier: String,
    table: Rc<RefCell<DefaultsTable>>,
    path: Vec<String>,
}

impl Defaults {
    /// Creates a new empty defaults source.
    pub fn new() -> Self {
        Self {
            identifier: DEFAULTS_ID.to_string(),
            table: Rc::new(RefCell::new(IndexMap::new())),
            path: Vec::new(),
        }
    }

    /// Creates a defaults source from a literal mapping.
    ///
    /// Nested `ConfigValue::Mapping` values become subsections; every other
    /// value is a default whose kind becomes the key's type.
    pub fn from_mapping(mapping: IndexMap<String, ConfigValue>) -> Self {
        let defaults = Self::new();
        *defaults.table.borrow_mut() = table_from_mapping(mapping);
        defaults
    }

    /// Overrides the identifier used for write-back addressing.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Declares a default value at this section.
    pub fn value(self, key: &str, value: impl Into<ConfigValue>) -> Self {
        let item = match value.into() {
            ConfigValue::Mapping(nested) => DefaultItem::Section(table_from_mapping(nested)),
            other => DefaultItem::Entry(DefaultEntry::literal(other)),
        };
        self.insert_root_item(key, item)
    }

    /// Declares a key's type without giving it a value.
    pub fn declare(self, key: &str, kind: ValueKind) -> Self {
        self.insert_root_item(key, DefaultItem::Entry(DefaultEntry::declared(kind)))
    }

    /// Nests another defaults source as the subsection `name`.
    pub fn section(self, name: &str, nested: Defaults) -> Self {
        let table = nested.table.borrow().clone();
        self.insert_root_item(name, DefaultItem::Section(table))
    }

    /// Returns the declared entry for `key` at this section.
    pub fn entry(&self, key: &str) -> Option<DefaultEntry> {
        self.with_table(|table| match table.get(key) {
            Some(DefaultItem::Entry(entry)) => Some(entry.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Builders only run on a root view, where a later declaration replaces
    /// an earlier one of the same name.
    fn insert_root_item(self, key: &str, item: DefaultItem) -> Self {
        self.table.borrow_mut().insert(key.to_string(), item);
        self
    }

    fn insert_entry(&self, key: &str, entry: DefaultEntry) -> ConfigResult<()> {
        let mut root = self.table.borrow_mut();
        let table = Self::walk_mut(&mut root, &self.path)?;
        if let Some(DefaultItem::Section(_)) = table.get(key) {
            return Err(ConfigError::invalid_value(
                key,
                "a subsection of that name exists in the defaults",
            ));
        }
        table.insert(key.to_string(), DefaultItem::Entry(entry));
        Ok(())
    }

    /// Runs `f` on this view's table, or returns `None` if the section does
    /// not exist (yet).
    fn with_table<R>(&self, f: impl FnOnce(&DefaultsTable) -> R) -> Option<R> {
        let root = self.table.borrow();
        let mut table = &*root;
        for name in &self.path {
            match table.get(name) {
                Some(DefaultItem::Section(nested)) => table = nested,
                _ => return None,
            }
        }
        Some(f(table))
    }

    /// Walks to the table at `path`, creating sections as needed.
    ///
    /// A path segment that names a value is an error; the value is kept.
    fn walk_mut<'a>(
        root: &'a mut DefaultsTable,
        path: &[String],
    ) -> ConfigResult<&'a mut DefaultsTable> {
        let mut table = root;
        for name in path {
            let item = table
                .entry(name.clone())
                .or_insert_with(|| DefaultItem::Section(IndexMap::new()));
            table = match item {
                DefaultItem::Section(nested) => nested,
                DefaultItem::Entry(_) => {
                    return Err(ConfigError::precondition(format!(
                        "'{}' is a value in the defaults, not a section",
                        path.join(".")
                    )))
                }
            };
        }
        Ok(table)
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for Defaults {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn has(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    fn get(&self, key: &str) -> ConfigResult<ConfigValue> {
        self.entry(key)
            .map(|entry| entry.default)
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    fn set(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        let hint = match value {
            ConfigValue::Null => self.entry(key).and_then(|entry| entry.hint),
            ref other => TypeHint::for_default(other),
        };
        let entry = DefaultEntry {
            hint,
            default: value,
        };
        self.insert_entry(key, entry)
    }

    fn keys(&self) -> Vec<String> {
        self.with_table(|table| {
            table
                .iter()
                .filter(|(_, item)| matches!(item, DefaultItem::Entry(_)))
                .map(|(key, _)| key.clone())
                .collect()
        })
        .unwrap_or_default()
    }

    fn subsections(&self) -> Vec<String> {
        self.with_table(|table| {
            table
                .iter()
                .filter(|(_, item)| matches!(item, DefaultItem::Section(_)))
                .map(|(key, _)| key.clone())
                .collect()
        })
        .unwrap_or_default()
    }

    fn subsection(&self, name: &str) -> Option<Box<dyn ConfigSource>> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Some(Box::new(Self {
            identifier: self.identifier.clone(),
            table: Rc::clone(&self.table),
            path,
        }))
    }

    fn type_hint(&self, key: &str) -> Option<TypeHint> {
        self.entry(key).and_then(|entry| entry.hint)
    }

    fn writable(&self) -> bool {
        true
    }

    fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    fn save(&mut self) -> ConfigResult<()> {
        if !self.is_root() {
            return Err(ConfigError::precondition(
                "save() may only be called on the root defaults view",
            ));
        }
        Ok(())
    }
}
