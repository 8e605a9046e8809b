//! Command line flag configuration source.

use crate::error::{ConfigError, ConfigResult};
use crate::source::ConfigSource;
use crate::value::ConfigValue;
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Separator joining subsection names and the key in a flag name.
const SEPARATOR: char = '-';

/// Configuration source that provides values from `--key=value` flags.
///
/// A flag without `=value` is an implicit boolean `true`; repeating a flag
/// accumulates its values into a list. Subsections use flattened names:
/// `--mymodule-loglevel=DEBUG` sets `loglevel` in section `mymodule`, and
/// every further `-` adds one level of nesting.
///
/// # Example
/// ```
/// use stratacfg::{CommandlineSource, ConfigSource, ConfigValue};
///
/// let cmdline = CommandlineSource::new(["--jsfiles=a.js", "--jsfiles=b.js", "--force"]);
/// assert_eq!(cmdline.get("jsfiles").unwrap(), ConfigValue::from(vec!["a.js", "b.js"]));
/// assert_eq!(cmdline.get("force").unwrap(), ConfigValue::Boolean(true));
/// ```
#[derive(Debug, Clone)]
pub struct CommandlineSource {
    identifier: String,
    /// Flag values keyed by their full flattened name
    flags: Rc<RefCell<IndexMap<String, ConfigValue>>>,
    /// Section path of this view
    path: Vec<String>,
}

impl CommandlineSource {
    /// Creates a source from command line arguments (without the program name).
    ///
    /// Arguments that are not long flags are skipped; a bare `--` ends flag
    /// parsing.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = IndexMap::new();
        for arg in args {
            let arg = arg.as_ref();
            if arg == "--" {
                break;
            }
            let Some(flag) = arg.strip_prefix("--").filter(|f| !f.is_empty()) else {
                debug!(argument = arg, "skipping non-flag argument");
                continue;
            };
            let (name, value) = match flag.split_once('=') {
                Some((name, value)) => (name, ConfigValue::from(value)),
                None => (flag, ConfigValue::Boolean(true)),
            };
            Self::accumulate(&mut flags, name, value);
        }

        debug!(count = flags.len(), "parsed command line flags");
        Self::from_flags(flags)
    }

    fn from_flags(flags: IndexMap<String, ConfigValue>) -> Self {
        Self {
            identifier: "commandline".to_string(),
            flags: Rc::new(RefCell::new(flags)),
            path: Vec::new(),
        }
    }

    /// Creates a source from arguments already matched by clap.
    ///
    /// Only values given on the command line are kept; clap defaults and
    /// environment fallbacks are left to the other sources. Argument ids
    /// follow the same flattened naming as raw flags.
    #[cfg(feature = "cli")]
    pub fn from_matches(matches: &clap::ArgMatches) -> Self {
        use clap::parser::ValueSource;

        let mut flags = IndexMap::new();
        for id in matches.ids() {
            let name = id.as_str();
            if matches.value_source(name) != Some(ValueSource::CommandLine) {
                continue;
            }

            let value = if let Ok(Some(flag)) = matches.try_get_one::<bool>(name) {
                ConfigValue::Boolean(*flag)
            } else {
                let mut raw: Vec<String> = matches
                    .try_get_raw(name)
                    .ok()
                    .flatten()
                    .map(|values| {
                        values
                            .map(|v| v.to_string_lossy().into_owned())
                            .collect()
                    })
                    .unwrap_or_default();
                match raw.len() {
                    0 => ConfigValue::Boolean(true),
                    1 => ConfigValue::String(raw.remove(0)),
                    _ => ConfigValue::List(raw),
                }
            };
            flags.insert(name.to_string(), value);
        }

        Self::from_flags(flags)
    }

    /// Overrides the identifier used for write-back addressing.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Merges a repeated flag into the value already recorded for it.
    fn accumulate(flags: &mut IndexMap<String, ConfigValue>, name: &str, value: ConfigValue) {
        let Some(existing) = flags.get_mut(name) else {
            flags.insert(name.to_string(), value);
            return;
        };
        let merged = match (std::mem::replace(existing, ConfigValue::Null), value) {
            (ConfigValue::Boolean(_), ConfigValue::Boolean(b)) => ConfigValue::Boolean(b),
            (ConfigValue::List(mut items), value) => {
                items.push(value.to_string());
                ConfigValue::List(items)
            }
            (previous, value) => ConfigValue::List(vec![previous.to_string(), value.to_string()]),
        };
        *existing = merged;
    }

    fn full_name(&self, key: &str) -> String {
        let mut name = String::new();
        for segment in &self.path {
            name.push_str(segment);
            name.push(SEPARATOR);
        }
        name.push_str(key);
        name
    }

    /// Splits a flag name into its segments below this view's section.
    ///
    /// Returns `None` for flags outside this section.
    fn relative<'a>(&self, name: &'a str) -> Option<Vec<&'a str>> {
        let segments: Vec<&str> = name.split(SEPARATOR).collect();
        if segments.len() <= self.path.len() {
            return None;
        }
        let inside = self
            .path
            .iter()
            .zip(&segments)
            .all(|(expected, actual)| expected == actual);
        inside.then(|| segments[self.path.len()..].to_vec())
    }
}

impl ConfigSource for CommandlineSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn has(&self, key: &str) -> bool {
        self.flags.borrow().contains_key(&self.full_name(key))
    }

    fn get(&self, key: &str) -> ConfigResult<ConfigValue> {
        self.flags
            .borrow()
            .get(&self.full_name(key))
            .cloned()
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    fn set(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        let name = self.full_name(key);
        self.flags.borrow_mut().insert(name, value);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.flags
            .borrow()
            .keys()
            .filter_map(|name| self.relative(name))
            .filter(|rest| rest.len() == 1)
            .map(|rest| rest[0].to_string())
            .collect()
    }

    fn subsections(&self) -> Vec<String> {
        let names: IndexSet<String> = self
            .flags
            .borrow()
            .keys()
            .filter_map(|name| self.relative(name))
            .filter(|rest| rest.len() > 1)
            .map(|rest| rest[0].to_string())
            .collect();
        names.into_iter().collect()
    }

    fn subsection(&self, name: &str) -> Option<Box<dyn ConfigSource>> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Some(Box::new(Self {
            identifier: self.identifier.clone(),
            flags: Rc::clone(&self.flags),
            path,
        }))
    }

    fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subsections_cmdline() -> CommandlineSource {
        CommandlineSource::new([
            "--datadir=mydata",
            "--processes=4",
            "--loglevel=INFO",
            "--forceparse=True",
            "--jsfiles=default.js",
            "--jsfiles=modernizr.js",
            "--mymodule-loglevel=DEBUG",
            "--mymodule-forceparse=False",
            "--mymodule-jsfiles=pdfviewer.js",
            "--mymodule-jsfiles=zepto.js",
            "--mymodule-lastrun=2012-09-18T15:41:00",
            "--mymodule-arbitrary-nesting-depth=works",
        ])
    }

    #[test]
    fn test_values_are_text() {
        let cmdline = CommandlineSource::new(["--datadir=mydata", "--processes=4"]);
        assert_eq!(cmdline.get("datadir").unwrap(), ConfigValue::from("mydata"));
        assert_eq!(cmdline.get("processes").unwrap(), ConfigValue::from("4"));
        assert!(!cmdline.typed("processes"));
    }

    #[test]
    fn test_implicit_boolean_and_repeats() {
        let cmdline = CommandlineSource::new([
            "--forceparse=True",
            "--implicitboolean",
            "--jsfiles=default.js",
            "--jsfiles=modernizr.js",
            "--jsfiles=third.js",
        ]);
        assert_eq!(
            cmdline.get("forceparse").unwrap(),
            ConfigValue::from("True")
        );
        assert_eq!(
            cmdline.get("implicitboolean").unwrap(),
            ConfigValue::Boolean(true)
        );
        assert_eq!(
            cmdline.get("jsfiles").unwrap(),
            ConfigValue::from(vec!["default.js", "modernizr.js", "third.js"])
        );
    }

    #[test]
    fn test_root_keys_and_subsections() {
        let cmdline = subsections_cmdline();
        assert_eq!(
            cmdline.keys(),
            vec!["datadir", "processes", "loglevel", "forceparse", "jsfiles"]
        );
        assert_eq!(cmdline.subsections(), vec!["mymodule"]);
        assert!(!cmdline.has("lastrun"));
    }

    #[test]
    fn test_nested_views() {
        let cmdline = subsections_cmdline();
        let module = cmdline.subsection("mymodule").unwrap();
        assert!(!module.is_root());
        assert_eq!(
            module.keys(),
            vec!["loglevel", "forceparse", "jsfiles", "lastrun"]
        );
        assert_eq!(module.subsections(), vec!["arbitrary"]);
        assert_eq!(module.get("loglevel").unwrap(), ConfigValue::from("DEBUG"));
        assert!(!module.has("datadir"));

        let depth = module
            .subsection("arbitrary")
            .and_then(|s| s.subsection("nesting"))
            .unwrap();
        assert_eq!(depth.get("depth").unwrap(), ConfigValue::from("works"));
    }

    #[test]
    fn test_non_flags_are_skipped() {
        let cmdline = CommandlineSource::new(["run", "-v", "--", "--after=1", "--loglevel=x"]);
        assert!(cmdline.keys().is_empty());

        let cmdline = CommandlineSource::new(["--loglevel=x", "input.txt"]);
        assert_eq!(cmdline.keys(), vec!["loglevel"]);
    }

    #[test]
    fn test_set_is_shared_between_views() {
        let cmdline = CommandlineSource::new(["--loglevel=INFO"]);
        let mut module = cmdline.subsection("mymodule").unwrap();
        module.set("loglevel", ConfigValue::from("ERROR")).unwrap();
        assert_eq!(cmdline.subsections(), vec!["mymodule"]);
        assert_eq!(cmdline.get("loglevel").unwrap(), ConfigValue::from("INFO"));
        assert!(!cmdline.writable());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_from_clap_matches() {
        use clap::{Arg, ArgAction, Command};

        let app = Command::new("myapp")
            .arg(Arg::new("loglevel").long("loglevel").default_value("INFO"))
            .arg(Arg::new("mymodule-loglevel").long("mymodule-loglevel"))
            .arg(
                Arg::new("jsfiles")
                    .long("jsfiles")
                    .action(ArgAction::Append),
            )
            .arg(Arg::new("force").long("force").action(ArgAction::SetTrue));
        let matches = app
            .try_get_matches_from([
                "myapp",
                "--mymodule-loglevel",
                "DEBUG",
                "--jsfiles",
                "a.js",
                "--jsfiles",
                "b.js",
                "--force",
            ])
            .unwrap();

        let cmdline = CommandlineSource::from_matches(&matches);
        assert!(!cmdline.has("loglevel"));
        assert_eq!(cmdline.get("force").unwrap(), ConfigValue::Boolean(true));
        assert_eq!(
            cmdline.get("jsfiles").unwrap(),
            ConfigValue::from(vec!["a.js", "b.js"])
        );
        let module = cmdline.subsection("mymodule").unwrap();
        assert_eq!(module.get("loglevel").unwrap(), ConfigValue::from("DEBUG"));
    }
}
