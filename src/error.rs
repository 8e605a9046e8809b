//! Error types and utilities for layered configuration.

use crate::value::ValueKind;
use std::path::PathBuf;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Comprehensive error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration text could not be parsed
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The backing medium of a source does not exist
    #[error("Configuration source unavailable: {}", path.display())]
    SourceUnavailable { path: PathBuf },

    /// A single source does not define the key at its section
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// No source in the whole lookup chain defines the key
    #[error("No configuration value for '{key}' in section {section}")]
    AttributeNotFound { key: String, section: String },

    /// A raw value could not be parsed into its declared type
    #[error("Cannot coerce value '{value}' of '{key}' to {kind}")]
    Coercion {
        key: String,
        value: String,
        kind: ValueKind,
    },

    /// A typed accessor was used on a value of another shape
    #[error("Type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// A value cannot be represented by the source it is written to
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Write-back addressed a source that the node does not have
    #[error("Unknown configuration source: {name}")]
    UnknownSource { name: String },

    /// A root-only operation was invoked on a section view
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Deserialization operation failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

impl ConfigError {
    /// Creates a new parse error with context.
    pub fn parse_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a new attribute not found error for the given section.
    pub fn attribute_not_found(key: impl Into<String>, section: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            key: key.into(),
            section: section.into(),
        }
    }

    /// Creates a new coercion error.
    pub fn coercion(key: impl Into<String>, value: impl Into<String>, kind: ValueKind) -> Self {
        Self::Coercion {
            key: key.into(),
            value: value.into(),
            kind,
        }
    }

    /// Creates a new type conversion error.
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new invalid value error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unknown source error.
    pub fn unknown_source(name: impl Into<String>) -> Self {
        Self::UnknownSource { name: name.into() }
    }

    /// Creates a new precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates a new deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Returns true if a single source lacked the key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, ConfigError::KeyNotFound { .. })
    }

    /// Returns true if the whole lookup chain lacked the key.
    pub fn is_attribute_not_found(&self) -> bool {
        matches!(self, ConfigError::AttributeNotFound { .. })
    }

    /// Returns true if a raw value failed to parse into its declared type.
    pub fn is_coercion(&self) -> bool {
        matches!(self, ConfigError::Coercion { .. })
    }

    /// Returns true if this error is related to type conversion.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self, ConfigError::TypeConversion { .. })
    }

    /// Returns true if this error is related to parsing.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::Parse { .. })
    }

    /// Returns true if a source refused to store a value.
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, ConfigError::InvalidValue { .. })
    }

    /// Returns true if a root-only operation was misused.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ConfigError::Precondition(_))
    }

    /// Returns true if this error is related to IO operations.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ConfigError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let error = ConfigError::key_not_found("datadir");
        assert!(matches!(error, ConfigError::KeyNotFound { .. }));

        let error = ConfigError::coercion("processes", "four", ValueKind::Int);
        assert!(matches!(error, ConfigError::Coercion { .. }));

        let error = ConfigError::parse_error("app.ini", "missing closing bracket");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_error_display() {
        let error = ConfigError::key_not_found("loglevel");
        assert_eq!(error.to_string(), "Key not found: loglevel");

        let error = ConfigError::attribute_not_found("datadir", "mymodule");
        assert_eq!(
            error.to_string(),
            "No configuration value for 'datadir' in section mymodule"
        );

        let error = ConfigError::coercion("processes", "four", ValueKind::Int);
        assert_eq!(
            error.to_string(),
            "Cannot coerce value 'four' of 'processes' to integer"
        );

        let error = ConfigError::SourceUnavailable {
            path: PathBuf::from("missing.ini"),
        };
        assert_eq!(
            error.to_string(),
            "Configuration source unavailable: missing.ini"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_error: ConfigError = io_error.into();
        assert!(config_error.is_io_error());
    }

    #[test]
    fn test_error_type_checking() {
        let key_error = ConfigError::key_not_found("force");
        assert!(key_error.is_key_not_found());
        assert!(!key_error.is_attribute_not_found());
        assert!(!key_error.is_coercion());

        let attr_error = ConfigError::attribute_not_found("force", "__root__");
        assert!(attr_error.is_attribute_not_found());
        assert!(!attr_error.is_key_not_found());

        let precondition = ConfigError::precondition("save() on a section view");
        assert!(precondition.is_precondition());
        assert!(!precondition.is_parse_error());

        let conversion = ConfigError::type_conversion("String", "i64");
        assert!(conversion.is_type_conversion());
        assert!(!conversion.is_coercion());

        let invalid = ConfigError::invalid_value("motd", "line breaks cannot be stored");
        assert!(invalid.is_invalid_value());
        assert_eq!(
            invalid.to_string(),
            "Invalid value for 'motd': line breaks cannot be stored"
        );
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let config_error: ConfigError = err.into();
        assert!(matches!(config_error, ConfigError::Deserialization(_)));
    }
}
