//! # stratacfg
//!
//! Layered configuration for Rust applications.
//!
//! Values are drawn from several ranked sources and merged into one view:
//!
//! - Hard-coded defaults, which also declare the type of each key
//! - INI files, with one level of sections
//! - Environment variables
//! - Command line flags, with `-`-joined names for nested sections
//!
//! ## Architecture Overview
//!
//! Sources are passed lowest precedence first. For every key the last source
//! that defines it wins:
//!
//! 1. **Defaults** - Fallback values and type declarations
//! 2. **INI file** - Values read from disk
//! 3. **Environment variables** - Values from the process environment
//! 4. **Command line flags** - Values from arguments
//!
//! Text sources carry no types. When the defaults declare a key as integer,
//! boolean, date, datetime or list, text from the other sources is parsed
//! into that type on lookup.
//!
//! ## Quick Start
//!
//! ```rust
//! use stratacfg::{CommandlineSource, ConfigValue, Defaults, EnvironmentSource, FileSource, LayeredConfig};
//!
//! let defaults = Defaults::new()
//!     .value("datadir", "mydata")
//!     .value("processes", 1i64)
//!     .value("force", false);
//!
//! let config = LayeredConfig::builder()
//!     .source(defaults)
//!     .source(FileSource::open("./myapp.ini").unwrap())
//!     .source(EnvironmentSource::new(Some("MYAPP")))
//!     .source(CommandlineSource::new(["--processes=4", "--force"]))
//!     .build();
//!
//! assert_eq!(config.get("processes").unwrap(), ConfigValue::Integer(4));
//! assert_eq!(config.get_bool("force").unwrap(), Some(true));
//! ```
//!
//! ## INI Files
//!
//! Keys of the `[__root__]` section are top-level keys; every other section
//! is a subsection:
//!
//! ```ini
//! [__root__]
//! datadir = mydata
//! processes = 4
//!
//! [mymodule]
//! loglevel = DEBUG
//! lastrun = 2012-09-18 15:41:00
//! ```
//!
//! A missing file yields an empty source and a warning; use
//! [`FileSource::open_required`] to treat it as an error.
//!
//! ## Sections and Cascade
//!
//! Sections are reached with [`LayeredConfig::section`]. With cascade
//! enabled, a key a section does not define is looked up in its parent:
//!
//! ```rust
//! use stratacfg::{CommandlineSource, ConfigValue, Defaults, LayeredConfig};
//!
//! let config = LayeredConfig::builder()
//!     .source(Defaults::new().value("force", false).section("mymodule", Defaults::new()))
//!     .source(CommandlineSource::new(["--mymodule-force"]))
//!     .cascade(true)
//!     .build();
//!
//! let module = config.section("mymodule").unwrap();
//! assert_eq!(module.get("force").unwrap(), ConfigValue::Boolean(true));
//! assert_eq!(config.get("force").unwrap(), ConfigValue::Boolean(false));
//! ```
//!
//! ## Write-back
//!
//! [`LayeredConfig::set`] changes a value in memory and
//! [`LayeredConfig::write`] saves every file of the tree, from any section:
//!
//! ```rust,no_run
//! use stratacfg::{FileSource, LayeredConfig};
//!
//! let config = LayeredConfig::builder()
//!     .source(FileSource::open("ferenda.ini").unwrap())
//!     .build();
//! let module = config.section("mymodule").unwrap();
//! module.set("loglevel", "ERROR").unwrap();
//! module.write().unwrap();
//! ```
//!
//! ## Command Line Flags
//!
//! When using the `cli` feature, arguments parsed by clap can be used as a
//! source:
//!
//! ```rust
//! # #[cfg(feature = "cli")]
//! # {
//! use clap::{Arg, Command};
//! use stratacfg::{CommandlineSource, LayeredConfig};
//!
//! let app = Command::new("myapp").arg(Arg::new("datadir").long("datadir"));
//! let matches = app.try_get_matches_from(["myapp", "--datadir", "/srv"]).unwrap();
//!
//! let config = LayeredConfig::builder()
//!     .source(CommandlineSource::from_matches(&matches))
//!     .build();
//! assert_eq!(config.get_string("datadir").unwrap().as_deref(), Some("/srv"));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `ConfigResult<T>` which is an alias for `Result<T, ConfigError>`:
//!
//! ```rust
//! use stratacfg::{ConfigError, Defaults, LayeredConfig};
//!
//! let config = LayeredConfig::builder().source(Defaults::new()).build();
//! match config.get("nonexistent") {
//!     Ok(value) => println!("Value: {}", value),
//!     Err(ConfigError::AttributeNotFound { key, .. }) => println!("Key '{}' not found", key),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod cli_source;
pub mod coerce;
pub mod config;
pub mod default_source;
pub mod env_source;
pub mod error;
pub mod file_source;
pub mod parser;
pub mod source;
pub mod value;

// Re-export main types for convenience
pub use cli_source::CommandlineSource;
pub use coerce::{coerce, TypeHint};
pub use config::{LayeredConfig, LayeredConfigBuilder};
pub use default_source::{DefaultEntry, Defaults};
pub use env_source::EnvironmentSource;
pub use error::{ConfigError, ConfigResult};
pub use file_source::FileSource;
pub use source::{ConfigSource, DEFAULTS_ID};
pub use value::{ConfigValue, ValueKind};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
