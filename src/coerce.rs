//! Type coercion of raw source values.
//!
//! Text-origin sources (INI files, environment, command line) carry no type
//! information. When a typed source such as [`Defaults`](crate::Defaults)
//! declares a kind for the same key, the raw text is parsed into that kind
//! here. Values that already have the target kind pass through unchanged, so
//! coercion is idempotent.

use crate::error::{ConfigError, ConfigResult};
use crate::value::{ConfigValue, ValueKind};
use chrono::{NaiveDate, NaiveDateTime};

/// Accepted layouts for datetime text, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// The target type for a key, as reported by a typed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHint {
    /// Kind the raw value is parsed into.
    pub kind: ValueKind,
    /// When false, text that does not parse as `kind` is passed through as a
    /// string instead of failing.
    pub strict: bool,
}

impl TypeHint {
    /// A hint that fails on unparseable text.
    pub fn new(kind: ValueKind) -> Self {
        Self { kind, strict: true }
    }

    /// A hint that passes unparseable text through unchanged.
    pub fn lenient(kind: ValueKind) -> Self {
        Self {
            kind,
            strict: false,
        }
    }

    /// Derives the hint implied by a literal default value.
    ///
    /// A boolean `true` default only marks the key as boolean-like: override
    /// text such as `out.log` stays a string, while `false` or `yes` still
    /// become booleans.
    pub fn for_default(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Boolean(true) => Some(Self::lenient(ValueKind::Bool)),
            other => other.kind().map(Self::new),
        }
    }
}

/// Coerces `raw` into the kind named by `hint`.
///
/// Without a hint the value is returned untouched. `key` is only used for
/// error reporting.
pub fn coerce(key: &str, raw: ConfigValue, hint: Option<TypeHint>) -> ConfigResult<ConfigValue> {
    let Some(hint) = hint else {
        return Ok(raw);
    };

    if raw.is_null() || raw.kind() == Some(hint.kind) {
        return Ok(raw);
    }

    match (hint.kind, raw) {
        (ValueKind::Mapping, raw) => Ok(raw),
        (ValueKind::String, ConfigValue::List(items)) => Ok(ConfigValue::List(items)),
        (ValueKind::String, raw) => Ok(ConfigValue::String(raw.to_string())),
        (ValueKind::Float, ConfigValue::Integer(i)) => Ok(ConfigValue::Float(i as f64)),
        (kind, ConfigValue::String(text)) => match parse_text(&text, kind) {
            Some(value) => Ok(value),
            None if hint.strict => Err(ConfigError::coercion(key, text, kind)),
            None => Ok(ConfigValue::String(text)),
        },
        (kind, raw) if hint.strict => Err(ConfigError::coercion(key, raw.to_string(), kind)),
        (_, raw) => Ok(raw),
    }
}

/// Parses `text` as `kind`, returning `None` when it does not fit.
fn parse_text(text: &str, kind: ValueKind) -> Option<ConfigValue> {
    let trimmed = text.trim();
    match kind {
        ValueKind::String | ValueKind::Mapping => Some(ConfigValue::String(text.to_string())),
        ValueKind::Bool => parse_bool(trimmed).map(ConfigValue::Boolean),
        ValueKind::Int => trimmed.parse::<i64>().ok().map(ConfigValue::Integer),
        ValueKind::Float => trimmed.parse::<f64>().ok().map(ConfigValue::Float),
        ValueKind::Date => parse_date(trimmed).map(ConfigValue::Date),
        ValueKind::DateTime => parse_datetime(trimmed).map(ConfigValue::DateTime),
        ValueKind::StringList => Some(ConfigValue::List(parse_list(text))),
    }
}

/// Recognises `true`/`1`/`yes` and `false`/`0`/`no`, case-insensitively.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parses a date, also accepting a datetime and keeping its date part.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

/// Parses a datetime in space- or `T`-separated layout; a bare date means midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads a bracketed list literal such as `['a', 'b']`.
///
/// Quoted elements keep their content verbatim apart from backslash escapes
/// (`\n`, `\r`, `\t`, or any other escaped character as itself); bare
/// elements are trimmed. Any other text is a single element; plain text is
/// never split on commas.
pub fn parse_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return vec![text.to_string()];
    };
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut quote: Option<char> = None;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some('t') => current.push('\t'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') if !quoted && current.trim().is_empty() => {
                current.clear();
                quoted = true;
                quote = Some(c);
            }
            (None, ',') => items.push(finish_item(&mut current, &mut quoted)),
            (None, c) if quoted && c.is_whitespace() => {}
            (None, c) => current.push(c),
        }
    }
    items.push(finish_item(&mut current, &mut quoted));
    items
}

fn finish_item(current: &mut String, quoted: &mut bool) -> String {
    let item = std::mem::take(current);
    if std::mem::take(quoted) {
        item
    } else {
        item.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> ConfigValue {
        ConfigValue::from(s)
    }

    #[test]
    fn test_no_hint_passes_through() {
        let value = coerce("processes", text("4"), None).unwrap();
        assert_eq!(value, text("4"));
    }

    #[test]
    fn test_integer_and_float() {
        let hint = Some(TypeHint::new(ValueKind::Int));
        assert_eq!(
            coerce("processes", text("4"), hint).unwrap(),
            ConfigValue::Integer(4)
        );
        assert!(coerce("processes", text("four"), hint)
            .unwrap_err()
            .is_coercion());

        let hint = Some(TypeHint::new(ValueKind::Float));
        assert_eq!(
            coerce("ratio", text("0.5"), hint).unwrap(),
            ConfigValue::Float(0.5)
        );
        assert_eq!(
            coerce("ratio", ConfigValue::Integer(2), hint).unwrap(),
            ConfigValue::Float(2.0)
        );
    }

    #[test]
    fn test_boolean_literals() {
        let hint = Some(TypeHint::new(ValueKind::Bool));
        for literal in ["true", "True", "1", "YES"] {
            assert_eq!(
                coerce("force", text(literal), hint).unwrap(),
                ConfigValue::Boolean(true),
                "literal {literal}"
            );
        }
        for literal in ["false", "FALSE", "0", "no"] {
            assert_eq!(
                coerce("force", text(literal), hint).unwrap(),
                ConfigValue::Boolean(false),
                "literal {literal}"
            );
        }
        assert!(coerce("force", text("maybe"), hint).unwrap_err().is_coercion());
    }

    #[test]
    fn test_true_default_is_lenient() {
        let hint = TypeHint::for_default(&ConfigValue::Boolean(true));
        assert_eq!(hint, Some(TypeHint::lenient(ValueKind::Bool)));
        assert_eq!(
            coerce("logfile", text("out.log"), hint).unwrap(),
            text("out.log")
        );
        assert_eq!(
            coerce("forceparse", text("False"), hint).unwrap(),
            ConfigValue::Boolean(false)
        );

        let hint = TypeHint::for_default(&ConfigValue::Boolean(false));
        assert_eq!(hint, Some(TypeHint::new(ValueKind::Bool)));
    }

    #[test]
    fn test_dates_and_datetimes() {
        let expected = NaiveDate::from_ymd_opt(2012, 9, 18)
            .unwrap()
            .and_hms_opt(15, 41, 0)
            .unwrap();
        let hint = Some(TypeHint::new(ValueKind::DateTime));
        for raw in ["2012-09-18 15:41:00", "2012-09-18T15:41:00"] {
            assert_eq!(
                coerce("lastrun", text(raw), hint).unwrap(),
                ConfigValue::DateTime(expected)
            );
        }
        assert_eq!(
            coerce("lastrun", text("2012-09-18"), hint).unwrap(),
            ConfigValue::DateTime(expected.date().and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(coerce("lastrun", text("yesterday"), hint)
            .unwrap_err()
            .is_coercion());

        let hint = Some(TypeHint::new(ValueKind::Date));
        assert_eq!(
            coerce("expires", text("2012-09-18"), hint).unwrap(),
            ConfigValue::Date(expected.date())
        );
    }

    #[test]
    fn test_lists() {
        let hint = Some(TypeHint::new(ValueKind::StringList));
        assert_eq!(
            coerce("jsfiles", text("['default.js','modernizr.js']"), hint).unwrap(),
            ConfigValue::from(vec!["default.js", "modernizr.js"])
        );
        assert_eq!(
            coerce("jsfiles", text("a.js, b.js"), hint).unwrap(),
            ConfigValue::from(vec!["a.js, b.js"])
        );
        let repeated = ConfigValue::from(vec!["pdfviewer.js", "zepto.js"]);
        assert_eq!(coerce("jsfiles", repeated.clone(), hint).unwrap(), repeated);
        assert_eq!(parse_list("[]"), Vec::<String>::new());
        assert_eq!(parse_list("[\"a,b\", c]"), vec!["a,b", "c"]);
    }

    #[test]
    fn test_list_literal_escapes() {
        assert_eq!(parse_list(r#"["it's", 'b']"#), vec!["it's", "b"]);
        assert_eq!(parse_list(r"['it\'s']"), vec!["it's"]);
        assert_eq!(
            parse_list(r"['c:\\dir', 'tab\there', 'two\nlines']"),
            vec!["c:\\dir", "tab\there", "two\nlines"]
        );
        assert_eq!(parse_list("[' padded ', bare ]"), vec![" padded ", "bare"]);
        assert_eq!(parse_list("['']"), vec![""]);
    }

    #[test]
    fn test_list_text_form_reads_back() {
        let hint = Some(TypeHint::new(ValueKind::StringList));
        let items = vec!["it's", "a,b", r#"say "hi""#, "back\\slash", "x\ty", ""];
        let written = ConfigValue::from(items.clone()).to_string();
        assert_eq!(
            coerce("jsfiles", ConfigValue::String(written), hint).unwrap(),
            ConfigValue::from(items)
        );
    }

    #[test]
    fn test_string_hint_stringifies_scalars() {
        let hint = Some(TypeHint::new(ValueKind::String));
        assert_eq!(
            coerce("datadir", ConfigValue::Boolean(true), hint).unwrap(),
            text("true")
        );
    }

    #[test]
    fn test_null_is_never_coerced() {
        let hint = Some(TypeHint::new(ValueKind::DateTime));
        assert_eq!(
            coerce("lastdownload", ConfigValue::Null, hint).unwrap(),
            ConfigValue::Null
        );
    }

    proptest! {
        #[test]
        fn prop_integer_coercion_is_idempotent(n in any::<i64>()) {
            let hint = Some(TypeHint::new(ValueKind::Int));
            let once = coerce("n", ConfigValue::String(n.to_string()), hint).unwrap();
            let twice = coerce("n", once.clone(), hint).unwrap();
            prop_assert_eq!(&once, &ConfigValue::Integer(n));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_text_without_hint_is_untouched(s in ".*") {
            let value = coerce("k", ConfigValue::String(s.clone()), None).unwrap();
            prop_assert_eq!(value, ConfigValue::String(s));
        }

        #[test]
        fn prop_native_values_pass_through(b in any::<bool>(), n in any::<i64>()) {
            let bool_hint = Some(TypeHint::new(ValueKind::Bool));
            prop_assert_eq!(coerce("b", ConfigValue::Boolean(b), bool_hint).unwrap(), ConfigValue::Boolean(b));
            let int_hint = Some(TypeHint::new(ValueKind::Int));
            prop_assert_eq!(coerce("n", ConfigValue::Integer(n), int_hint).unwrap(), ConfigValue::Integer(n));
        }
    }
}
