//! INI document model used by the file source.
//!
//! The document keeps sections and the keys inside each section in the order
//! they were read, appends new ones at the end, and serializes every section
//! as a block followed by a single blank line.
//!
//! ```
//! use stratacfg::parser::IniDocument;
//!
//! let doc = IniDocument::parse("[__root__]\ndatadir = mydata\n\n[mymodule]\nloglevel = DEBUG\n", "app.ini").unwrap();
//! assert_eq!(doc.get("mymodule", "loglevel"), Some("DEBUG"));
//! assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["__root__", "mymodule"]);
//! ```

use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;

/// Section holding top-level keys.
pub const ROOT_SECTION: &str = "__root__";

/// Parsed INI text: ordered sections of ordered `key = value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl IniDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses INI text.
    ///
    /// Blank lines and lines starting with `#` or `;` are ignored. Keys that
    /// appear before any section header belong to [`ROOT_SECTION`]. A
    /// section header seen twice continues the earlier section.
    ///
    /// # Errors
    /// * `ConfigError::Parse` - On an empty section name, an empty key, or a
    ///   line that is neither a header nor a `key = value` / `key: value` pair
    pub fn parse(content: &str, source_name: &str) -> ConfigResult<Self> {
        let mut doc = Self::new();
        let mut current = ROOT_SECTION.to_string();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            // Check for section header
            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                if name.is_empty() {
                    return Err(ConfigError::parse_error(
                        source_name,
                        format!("line {}: empty section name", number + 1),
                    ));
                }
                current = name.to_string();
                doc.sections.entry(current.clone()).or_default();
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(ConfigError::parse_error(
                    source_name,
                    format!("line {}: invalid line format: {line}", number + 1),
                ));
            };
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            if key.is_empty() {
                return Err(ConfigError::parse_error(
                    source_name,
                    format!("line {}: empty key name", number + 1),
                ));
            }

            doc.sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }

        Ok(doc)
    }

    /// Renders the document back to INI text.
    pub fn serialize(&self) -> String {
        let mut output = String::new();
        for (name, entries) in &self.sections {
            output.push_str(&format!("[{name}]\n"));
            for (key, value) in entries {
                output.push_str(&format!("{key} = {value}\n"));
            }
            output.push('\n');
        }
        output
    }

    /// Returns the raw text stored for `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Stores `value`, appending the key (and section) if new.
    pub fn set(&mut self, section: &str, key: &str, value: String) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Keys of `section` in document order.
    pub fn keys(&self, section: &str) -> Vec<String> {
        self.sections
            .get(section)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All section names in document order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FERENDA: &str = "
[__root__]
datadir = mydata
processes = 4
loglevel = INFO
forceparse = True
jsfiles = ['default.js','modernizr.js']

[mymodule]
loglevel = DEBUG
forceparse=False
jsfiles = ['pdfviewer.js','zepto.js']
lastrun = 2012-09-18 15:41:00
";

    #[test]
    fn test_parse_sections_in_order() {
        let doc = IniDocument::parse(FERENDA, "ferenda.ini").unwrap();
        assert_eq!(
            doc.section_names().collect::<Vec<_>>(),
            vec!["__root__", "mymodule"]
        );
        assert_eq!(
            doc.keys(ROOT_SECTION),
            vec!["datadir", "processes", "loglevel", "forceparse", "jsfiles"]
        );
        assert_eq!(doc.get("mymodule", "forceparse"), Some("False"));
        assert_eq!(
            doc.get("mymodule", "lastrun"),
            Some("2012-09-18 15:41:00")
        );
        assert_eq!(
            doc.get(ROOT_SECTION, "jsfiles"),
            Some("['default.js','modernizr.js']")
        );
    }

    #[test]
    fn test_serialize_normalizes_layout() {
        let doc = IniDocument::parse(FERENDA, "ferenda.ini").unwrap();
        let expected = "[__root__]
datadir = mydata
processes = 4
loglevel = INFO
forceparse = True
jsfiles = ['default.js','modernizr.js']

[mymodule]
loglevel = DEBUG
forceparse = False
jsfiles = ['pdfviewer.js','zepto.js']
lastrun = 2012-09-18 15:41:00

";
        assert_eq!(doc.serialize(), expected);
    }

    #[test]
    fn test_set_appends_new_keys_and_sections() {
        let mut doc = IniDocument::parse("[__root__]\na = 1\nb = 2\n", "t.ini").unwrap();
        doc.set(ROOT_SECTION, "a", "10".to_string());
        doc.set(ROOT_SECTION, "c", "3".to_string());
        doc.set("extra", "d", "4".to_string());
        assert_eq!(
            doc.serialize(),
            "[__root__]\na = 10\nb = 2\nc = 3\n\n[extra]\nd = 4\n\n"
        );
    }

    #[test]
    fn test_keys_before_header_are_root() {
        let doc = IniDocument::parse("debug = true\n; comment\n# other\n[db]\nhost: localhost\n", "t.ini")
            .unwrap();
        assert_eq!(doc.get(ROOT_SECTION, "debug"), Some("true"));
        assert_eq!(doc.get("db", "host"), Some("localhost"));
    }

    #[test]
    fn test_parse_errors() {
        let err = IniDocument::parse("[]\n", "bad.ini").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("bad.ini"));

        assert!(IniDocument::parse("= value\n", "bad.ini")
            .unwrap_err()
            .is_parse_error());
        assert!(IniDocument::parse("[s]\njust text\n", "bad.ini")
            .unwrap_err()
            .is_parse_error());
    }

    #[test]
    fn test_empty_document() {
        let doc = IniDocument::parse("", "empty.ini").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.serialize(), "");
        assert!(doc.keys(ROOT_SECTION).is_empty());
    }

    proptest! {
        #[test]
        fn prop_serialize_then_parse_preserves_values(
            entries in proptest::collection::vec(("[a-z][a-z0-9_]{0,8}", "[A-Za-z0-9_./-]{0,12}"), 0..8)
        ) {
            let mut doc = IniDocument::new();
            for (key, value) in &entries {
                doc.set("section", key, value.clone());
            }
            let reparsed = IniDocument::parse(&doc.serialize(), "prop.ini").unwrap();
            prop_assert_eq!(reparsed, doc);
        }
    }
}
