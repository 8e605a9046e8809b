//! Configuration value types and conversion utilities.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Text layout used when a datetime is written back to a text source.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Text layout used when a date is written back to a text source.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents a resolved configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time of day, without timezone
    DateTime(NaiveDateTime),
    /// Ordered list of strings
    List(Vec<String>),
    /// Nested mapping, keys in insertion order
    Mapping(IndexMap<String, ConfigValue>),
    /// Declared but absent value
    Null,
}

/// The semantic type a configuration key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int,
    Bool,
    Float,
    Date,
    DateTime,
    StringList,
    Mapping,
}

impl ValueKind {
    /// Returns a human-readable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "integer",
            ValueKind::Bool => "boolean",
            ValueKind::Float => "float",
            ValueKind::Date => "date",
            ValueKind::DateTime => "datetime",
            ValueKind::StringList => "list",
            ValueKind::Mapping => "mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ConfigValue {
    /// Returns the value as a string reference if it's a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it's an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64 if it's a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the value as a bool if it's a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ConfigValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            ConfigValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the value as a list of strings if it's a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the value as a mapping reference if it's a mapping.
    pub fn as_mapping(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Checks if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Returns the kind of this value, or `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            ConfigValue::String(_) => Some(ValueKind::String),
            ConfigValue::Integer(_) => Some(ValueKind::Int),
            ConfigValue::Float(_) => Some(ValueKind::Float),
            ConfigValue::Boolean(_) => Some(ValueKind::Bool),
            ConfigValue::Date(_) => Some(ValueKind::Date),
            ConfigValue::DateTime(_) => Some(ValueKind::DateTime),
            ConfigValue::List(_) => Some(ValueKind::StringList),
            ConfigValue::Mapping(_) => Some(ValueKind::Mapping),
            ConfigValue::Null => None,
        }
    }

    /// Returns the type name of the ConfigValue variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "String",
            ConfigValue::Integer(_) => "Integer",
            ConfigValue::Float(_) => "Float",
            ConfigValue::Boolean(_) => "Boolean",
            ConfigValue::Date(_) => "Date",
            ConfigValue::DateTime(_) => "DateTime",
            ConfigValue::List(_) => "List",
            ConfigValue::Mapping(_) => "Mapping",
            ConfigValue::Null => "Null",
        }
    }
}

/// Writes one list element as a quoted literal.
///
/// Single quotes are used unless the element contains a single quote and no
/// double quote. Backslashes, the chosen quote and control characters are
/// escaped, so [`parse_list`](crate::coerce::parse_list) reads it back as is.
fn write_quoted(f: &mut fmt::Formatter<'_>, item: &str) -> fmt::Result {
    let quote = if item.contains('\'') && !item.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in item.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Text form of a value, as stored in INI files.
///
/// Lists render as a bracketed literal (`['a', 'b']`) so that a list-typed
/// key reads back into the same elements.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Boolean(b) => write!(f, "{b}"),
            ConfigValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            ConfigValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            ConfigValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, item)?;
                }
                f.write_str("]")
            }
            ConfigValue::Mapping(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            ConfigValue::Null => Ok(()),
        }
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i as i64)
    }
}

impl From<u32> for ConfigValue {
    fn from(i: u32) -> Self {
        ConfigValue::Integer(i as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<NaiveDate> for ConfigValue {
    fn from(d: NaiveDate) -> Self {
        ConfigValue::Date(d)
    }
}

impl From<NaiveDateTime> for ConfigValue {
    fn from(dt: NaiveDateTime) -> Self {
        ConfigValue::DateTime(dt)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(items: Vec<String>) -> Self {
        ConfigValue::List(items)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(items: Vec<&str>) -> Self {
        ConfigValue::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<IndexMap<String, ConfigValue>> for ConfigValue {
    fn from(map: IndexMap<String, ConfigValue>) -> Self {
        ConfigValue::Mapping(map)
    }
}

impl From<Option<ConfigValue>> for ConfigValue {
    fn from(opt: Option<ConfigValue>) -> Self {
        opt.unwrap_or(ConfigValue::Null)
    }
}

/// Error type for ConfigValue conversion failures
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    pub from_type: String,
    pub to_type: String,
    pub value: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot convert {} value '{}' to {}",
            self.from_type, self.value, self.to_type
        )
    }
}

impl std::error::Error for ConversionError {}

impl From<ConversionError> for crate::error::ConfigError {
    fn from(err: ConversionError) -> Self {
        crate::error::ConfigError::type_conversion(err.from_type, err.to_type)
    }
}

impl ConversionError {
    fn new(value: &ConfigValue, to_type: &str) -> Self {
        Self {
            from_type: value.type_name().to_string(),
            to_type: to_type.to_string(),
            value: value.to_string(),
        }
    }
}

impl TryFrom<ConfigValue> for String {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::String(s) => Ok(s),
            other => Err(ConversionError::new(&other, "String")),
        }
    }
}

impl TryFrom<ConfigValue> for i64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Integer(i) => Ok(i),
            other => Err(ConversionError::new(&other, "i64")),
        }
    }
}

impl TryFrom<ConfigValue> for f64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Float(f) => Ok(f),
            ConfigValue::Integer(i) => Ok(i as f64),
            other => Err(ConversionError::new(&other, "f64")),
        }
    }
}

impl TryFrom<ConfigValue> for bool {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Boolean(b) => Ok(b),
            other => Err(ConversionError::new(&other, "bool")),
        }
    }
}

impl TryFrom<ConfigValue> for NaiveDate {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Date(d) => Ok(d),
            other => Err(ConversionError::new(&other, "NaiveDate")),
        }
    }
}

impl TryFrom<ConfigValue> for NaiveDateTime {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::DateTime(dt) => Ok(dt),
            other => Err(ConversionError::new(&other, "NaiveDateTime")),
        }
    }
}

impl TryFrom<ConfigValue> for Vec<String> {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::List(items) => Ok(items),
            other => Err(ConversionError::new(&other, "Vec<String>")),
        }
    }
}
