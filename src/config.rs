//! Layered configuration tree: lookup, cascade, subsections and write-back.

use crate::coerce::{coerce, TypeHint};
use crate::default_source::Defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::source::{utils, ConfigSource, DEFAULTS_ID};
use crate::value::{ConfigValue, ConversionError};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

struct NodeInner {
    /// Section names from the root down to this node; empty for the root
    path: Vec<String>,
    /// Section views in precedence order, lowest first
    sources: RefCell<Vec<Box<dyn ConfigSource>>>,
    cascade: bool,
    parent: Option<Weak<NodeInner>>,
    /// Handle to the tree root; `None` on the root itself
    root: Option<Weak<NodeInner>>,
    children: RefCell<IndexMap<String, LayeredConfig>>,
}

/// One section of a layered configuration, seen across all of its sources.
///
/// Sources are given lowest precedence first: for every key the value of the
/// last source that defines it wins. Text from untyped sources is coerced to
/// the type a [`Defaults`] source declares for the same key.
///
/// `LayeredConfig` is a cheap handle; clones refer to the same node. Nested
/// sections are created on first access and cached, so changes made through
/// a section handle are visible on every later access. Nodes share their
/// backing stores through `Rc`, which makes the whole tree `!Send`: a
/// configuration must stay on one thread, and callers that need concurrent
/// mutation have to synchronize access themselves.
///
/// # Example
/// ```
/// use stratacfg::{CommandlineSource, ConfigValue, Defaults, LayeredConfig};
///
/// let config = LayeredConfig::builder()
///     .source(Defaults::new().value("loglevel", "INFO").value("processes", 1i64))
///     .source(CommandlineSource::new(["--processes=4", "--mymodule-loglevel=DEBUG"]))
///     .build();
///
/// assert_eq!(config.get("processes").unwrap(), ConfigValue::Integer(4));
/// let module = config.section("mymodule").unwrap();
/// assert_eq!(module.get_string("loglevel").unwrap().as_deref(), Some("DEBUG"));
/// ```
#[derive(Clone)]
pub struct LayeredConfig {
    inner: Rc<NodeInner>,
}

/// Builder for a root [`LayeredConfig`].
#[derive(Default)]
pub struct LayeredConfigBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
    cascade: bool,
}

impl LayeredConfigBuilder {
    /// Adds a source above every source added so far.
    pub fn source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Adds an already boxed source above every source added so far.
    pub fn boxed_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Enables fallback from sections to their ancestors.
    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn build(self) -> LayeredConfig {
        LayeredConfig::new_root(self.sources, self.cascade)
    }
}

impl LayeredConfig {
    /// Creates a root configuration without cascade.
    pub fn new(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self::new_root(sources, false)
    }

    /// Creates a root configuration whose sections fall back to their ancestors.
    pub fn with_cascade(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self::new_root(sources, true)
    }

    pub fn builder() -> LayeredConfigBuilder {
        LayeredConfigBuilder::default()
    }

    fn new_root(mut sources: Vec<Box<dyn ConfigSource>>, cascade: bool) -> Self {
        // Write-back always needs somewhere to put new keys
        if utils::position_of(&sources, DEFAULTS_ID).is_none() {
            sources.insert(0, Box::new(Defaults::new()));
        }

        debug!(
            sources = ?sources.iter().map(|s| s.identifier()).collect::<Vec<_>>(),
            cascade,
            "created layered configuration"
        );

        Self {
            inner: Rc::new(NodeInner {
                path: Vec::new(),
                sources: RefCell::new(sources),
                cascade,
                parent: None,
                root: None,
                children: RefCell::new(IndexMap::new()),
            }),
        }
    }

    fn from_inner(inner: Rc<NodeInner>) -> Self {
        Self { inner }
    }

    /// Name of this section, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.inner.path.last().map(String::as_str)
    }

    /// Section names from the root down to this node.
    pub fn path(&self) -> &[String] {
        &self.inner.path
    }

    pub fn is_cascading(&self) -> bool {
        self.inner.cascade
    }

    /// The enclosing section, if this is a subsection and the tree is still alive.
    pub fn parent(&self) -> Option<LayeredConfig> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Self::from_inner)
    }

    /// The root of the tree this node belongs to.
    ///
    /// Returns `None` only when every handle to the root has been dropped.
    pub fn root(&self) -> Option<LayeredConfig> {
        match &self.inner.root {
            None => Some(self.clone()),
            Some(root) => root.upgrade().map(Self::from_inner),
        }
    }

    fn root_handle(&self) -> Weak<NodeInner> {
        match &self.inner.root {
            Some(root) => root.clone(),
            None => Rc::downgrade(&self.inner),
        }
    }

    fn section_label(&self) -> String {
        if self.inner.path.is_empty() {
            "<root>".to_string()
        } else {
            self.inner.path.join(".")
        }
    }

    /// This node, followed by its ancestors when cascade is enabled.
    ///
    /// Cascade needs every ancestor, so a section whose tree has been
    /// dropped cannot resolve through it.
    fn lookup_chain(&self) -> ConfigResult<Vec<LayeredConfig>> {
        let mut chain = vec![self.clone()];
        if !self.inner.cascade {
            return Ok(chain);
        }
        let mut next = self.inner.parent.clone();
        while let Some(weak) = next {
            let node = weak.upgrade().map(Self::from_inner).ok_or_else(|| {
                ConfigError::precondition(format!(
                    "section {} outlived its parent; cascade needs the whole tree alive",
                    self.section_label()
                ))
            })?;
            next = node.inner.parent.clone();
            chain.push(node);
        }
        Ok(chain)
    }

    fn type_hint(chain: &[LayeredConfig], key: &str) -> Option<TypeHint> {
        chain
            .iter()
            .find_map(|node| utils::type_hint(&node.inner.sources.borrow(), key))
    }

    /// Resolves `key` at this section.
    ///
    /// The highest-precedence source defining the key answers. With cascade
    /// enabled, a key no source defines here is looked up in the parent
    /// section, and so on up to the root. Raw values are coerced with the
    /// type hint of the nearest typed source; values from a source that is
    /// itself typed for the key are returned as they are.
    ///
    /// A key declared in [`Defaults`] without a value resolves to
    /// `ConfigValue::Null`.
    ///
    /// # Errors
    /// * `ConfigError::AttributeNotFound` - If no source in the chain defines the key
    /// * `ConfigError::Coercion` - If the raw value does not parse as its declared type
    /// * `ConfigError::Precondition` - If cascade is on and an ancestor section is gone
    pub fn get(&self, key: &str) -> ConfigResult<ConfigValue> {
        let chain = self.lookup_chain()?;
        for node in &chain {
            let sources = node.inner.sources.borrow();
            let Some(index) = utils::first_defining(&sources, key) else {
                continue;
            };
            let source = &sources[index];
            let raw = source.get(key)?;
            trace!(
                key,
                section = %node.section_label(),
                source = source.identifier(),
                "resolved configuration value"
            );
            if source.typed(key) {
                return Ok(raw);
            }
            return coerce(key, raw, Self::type_hint(&chain, key));
        }

        Err(ConfigError::attribute_not_found(key, self.section_label()))
    }

    /// True if `get(key)` would find a value.
    ///
    /// # Errors
    /// * `ConfigError::Precondition` - If cascade is on and an ancestor section is gone
    pub fn has(&self, key: &str) -> ConfigResult<bool> {
        Ok(self
            .lookup_chain()?
            .iter()
            .any(|node| node.inner.sources.borrow().iter().any(|s| s.has(key))))
    }

    fn get_typed<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: TryFrom<ConfigValue, Error = ConversionError>,
    {
        let value = self.get(key)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(T::try_from(value)?))
    }

    /// Gets a value as a string; `None` for a declared key without a value.
    pub fn get_string(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_typed(key)
    }

    pub fn get_int(&self, key: &str) -> ConfigResult<Option<i64>> {
        self.get_typed(key)
    }

    /// Gets a value as a float; integers are widened.
    pub fn get_float(&self, key: &str) -> ConfigResult<Option<f64>> {
        self.get_typed(key)
    }

    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        self.get_typed(key)
    }

    pub fn get_date(&self, key: &str) -> ConfigResult<Option<NaiveDate>> {
        self.get_typed(key)
    }

    pub fn get_datetime(&self, key: &str) -> ConfigResult<Option<NaiveDateTime>> {
        self.get_typed(key)
    }

    pub fn get_list(&self, key: &str) -> ConfigResult<Option<Vec<String>>> {
        self.get_typed(key)
    }

    /// Keys defined at this section by any source, in first-seen order.
    ///
    /// Keys only reachable through cascade are not listed.
    pub fn keys(&self) -> Vec<String> {
        utils::collect_keys(&self.inner.sources.borrow())
    }

    /// Names of the sections directly below this one.
    pub fn subsections(&self) -> Vec<String> {
        let mut names: IndexSet<String> =
            utils::collect_subsections(&self.inner.sources.borrow())
                .into_iter()
                .collect();
        names.extend(self.inner.children.borrow().keys().cloned());
        names.into_iter().collect()
    }

    /// Returns the nested section `name`.
    ///
    /// The section is built on first access and the same node is returned
    /// afterwards.
    ///
    /// # Errors
    /// * `ConfigError::AttributeNotFound` - If no source defines the section
    pub fn section(&self, name: &str) -> ConfigResult<LayeredConfig> {
        if let Some(child) = self.inner.children.borrow().get(name) {
            return Ok(child.clone());
        }

        let defined = self
            .inner
            .sources
            .borrow()
            .iter()
            .any(|source| source.subsections().iter().any(|n| n == name));
        if !defined {
            return Err(ConfigError::attribute_not_found(name, self.section_label()));
        }
        Ok(self.materialize(name))
    }

    /// Returns the nested section `name`, creating it if no source has it yet.
    pub fn create_section(&self, name: &str) -> LayeredConfig {
        if let Some(child) = self.inner.children.borrow().get(name) {
            return child.clone();
        }
        self.materialize(name)
    }

    fn materialize(&self, name: &str) -> LayeredConfig {
        // Sources without nesting at this depth are left out
        let sources: Vec<Box<dyn ConfigSource>> = self
            .inner
            .sources
            .borrow()
            .iter()
            .filter_map(|source| source.subsection(name))
            .collect();

        let mut path = self.inner.path.clone();
        path.push(name.to_string());
        debug!(
            section = %path.join("."),
            sources = sources.len(),
            "materialized configuration section"
        );

        let child = Self::from_inner(Rc::new(NodeInner {
            path,
            sources: RefCell::new(sources),
            cascade: self.inner.cascade,
            parent: Some(Rc::downgrade(&self.inner)),
            root: Some(self.root_handle()),
            children: RefCell::new(IndexMap::new()),
        }));
        self.inner
            .children
            .borrow_mut()
            .insert(name.to_string(), child.clone());
        child
    }

    /// Sets `key` at this section; see [`set_in`](Self::set_in).
    pub fn set(&self, key: &str, value: impl Into<ConfigValue>) -> ConfigResult<()> {
        self.set_in(key, value, None)
    }

    /// Sets `key` at this section in a chosen source.
    ///
    /// With a source identifier, that source is written. Otherwise the
    /// highest-precedence writable source already defining the key is
    /// written, falling back to the lowest-precedence writable source
    /// (normally the defaults). Values land in memory only; call
    /// [`write`](Self::write) to persist.
    ///
    /// # Errors
    /// * `ConfigError::UnknownSource` - If `source` names no source of this section
    /// * `ConfigError::Precondition` - If no source of this section is writable
    /// * `ConfigError::InvalidValue` - If the chosen source cannot store the value
    pub fn set_in(
        &self,
        key: &str,
        value: impl Into<ConfigValue>,
        source: Option<&str>,
    ) -> ConfigResult<()> {
        let mut sources = self.inner.sources.borrow_mut();
        let index = match source {
            Some(name) => utils::position_of(&sources, name)
                .ok_or_else(|| ConfigError::unknown_source(name))?,
            None => sources
                .iter()
                .rposition(|s| s.writable() && s.has(key))
                .or_else(|| sources.iter().position(|s| s.writable()))
                .ok_or_else(|| {
                    ConfigError::precondition(format!(
                        "no writable source for '{key}' in section {}",
                        self.section_label()
                    ))
                })?,
        };

        debug!(
            key,
            section = %self.section_label(),
            source = sources[index].identifier(),
            "setting configuration value"
        );
        sources[index].set(key, value.into())
    }

    /// Persists every source of the whole tree.
    ///
    /// May be called on any section: one file holds all sections, so the
    /// root's sources are saved.
    ///
    /// # Errors
    /// * `ConfigError::Precondition` - If the root of the tree has been dropped
    /// * `ConfigError::Io` - If a file cannot be written
    pub fn write(&self) -> ConfigResult<()> {
        let root = self
            .root()
            .ok_or_else(|| ConfigError::precondition("configuration root has been dropped"))?;
        let mut sources = root.inner.sources.borrow_mut();
        for source in sources.iter_mut() {
            source.save()?;
        }
        debug!(sources = sources.len(), "wrote configuration");
        Ok(())
    }

    /// Whether the source called `identifier` has unsaved changes.
    pub fn is_dirty(&self, identifier: &str) -> ConfigResult<bool> {
        let sources = self.inner.sources.borrow();
        utils::position_of(&sources, identifier)
            .map(|index| sources[index].is_dirty())
            .ok_or_else(|| ConfigError::unknown_source(identifier))
    }

    /// Identifiers of the sources of this section, lowest precedence first.
    pub fn source_identifiers(&self) -> Vec<String> {
        self.inner
            .sources
            .borrow()
            .iter()
            .map(|source| source.identifier().to_string())
            .collect()
    }

    /// Resolves this section and all sections below it into a mapping.
    pub fn dump(&self) -> ConfigResult<ConfigValue> {
        let mut mapping = IndexMap::new();
        for key in self.keys() {
            let value = self.get(&key)?;
            mapping.insert(key, value);
        }
        for name in self.subsections() {
            let section = self.create_section(&name);
            mapping.insert(name, section.dump()?);
        }
        Ok(ConfigValue::Mapping(mapping))
    }

    /// Deserializes this section into `T`.
    ///
    /// # Example
    /// ```
    /// use serde::Deserialize;
    /// use stratacfg::{Defaults, LayeredConfig};
    ///
    /// #[derive(Deserialize)]
    /// struct Settings {
    ///     datadir: String,
    ///     processes: i64,
    /// }
    ///
    /// let config = LayeredConfig::builder()
    ///     .source(Defaults::new().value("datadir", "mydata").value("processes", 4i64))
    ///     .build();
    /// let settings: Settings = config.extract().unwrap();
    /// assert_eq!(settings.processes, 4);
    /// ```
    pub fn extract<T>(&self) -> ConfigResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let dumped = self.dump()?;
        serde_json::from_value(serde_json::to_value(dumped)?).map_err(|e| {
            ConfigError::deserialization(format!("Failed to extract configuration: {e}"))
        })
    }
}

impl fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("section", &self.section_label())
            .field("sources", &self.source_identifiers())
            .field("cascade", &self.inner.cascade)
            .finish()
    }
}
