//! Environment variable configuration source.

use crate::error::{ConfigError, ConfigResult};
use crate::source::ConfigSource;
use crate::value::ConfigValue;
use indexmap::IndexMap;
use std::env;
use tracing::debug;

/// Configuration source that reads from environment variables.
///
/// Variables are snapshotted when the source is created. With a prefix such
/// as `MYAPP`, only `MYAPP_*` variables are visible and `MYAPP_DATADIR`
/// becomes the key `datadir`; without one, every variable is visible under
/// its lower-cased name. Values are always text and the source has no
/// subsections.
///
/// # Example
/// ```
/// use stratacfg::{ConfigSource, EnvironmentSource};
///
/// let env = EnvironmentSource::from_vars(
///     vec![("MYAPP_DATADIR".to_string(), "/srv/data".to_string())],
///     Some("MYAPP"),
/// );
/// assert!(env.has("datadir"));
/// ```
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    identifier: String,
    /// Optional prefix for environment variable names
    prefix: Option<String>,
    /// Snapshot of matching variables, keyed by configuration key
    vars: IndexMap<String, String>,
}

impl EnvironmentSource {
    /// Creates a source from the current process environment.
    ///
    /// # Arguments
    /// * `prefix` - Optional prefix to filter environment variables
    pub fn new(prefix: Option<&str>) -> Self {
        Self::from_vars(env::vars(), prefix)
    }

    /// Creates a source from an explicit list of variables.
    pub fn from_vars<I>(vars: I, prefix: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = prefix.map(|p| p.trim_end_matches('_').to_string());
        let mut matched: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                Self::config_key(prefix.as_deref(), &name).map(|key| (key, value))
            })
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(
            prefix = prefix.as_deref().unwrap_or(""),
            count = matched.len(),
            "loaded environment variables"
        );

        Self {
            identifier: "environment".to_string(),
            prefix,
            vars: matched.into_iter().collect(),
        }
    }

    /// Overrides the identifier used for write-back addressing.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Returns the configured prefix, without its trailing underscore.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Maps a variable name to a configuration key, if it matches the prefix.
    fn config_key(prefix: Option<&str>, name: &str) -> Option<String> {
        let key = match prefix {
            Some(prefix) => name.strip_prefix(prefix)?.strip_prefix('_')?,
            None => name,
        };
        if key.is_empty() {
            None
        } else {
            Some(key.to_lowercase())
        }
    }

    /// Transforms a configuration key to the environment variable name it
    /// was read from.
    ///
    /// # Example
    /// ```
    /// use stratacfg::EnvironmentSource;
    ///
    /// let env = EnvironmentSource::from_vars(Vec::new(), Some("APP"));
    /// assert_eq!(env.variable_name("datadir"), "APP_DATADIR");
    /// ```
    pub fn variable_name(&self, key: &str) -> String {
        let name = key.to_uppercase();
        match self.prefix {
            Some(ref prefix) => format!("{prefix}_{name}"),
            None => name,
        }
    }
}

impl ConfigSource for EnvironmentSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn has(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    fn get(&self, key: &str) -> ConfigResult<ConfigValue> {
        self.vars
            .get(key)
            .map(|value| ConfigValue::String(value.clone()))
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    fn set(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        // The process environment itself is never modified
        self.vars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }
}
