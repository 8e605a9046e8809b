//! Configuration source abstraction and precedence helpers.

use crate::coerce::TypeHint;
use crate::error::ConfigResult;
use crate::value::ConfigValue;
use indexmap::IndexSet;

/// Identifier of the lowest-precedence, always-present defaults source.
pub const DEFAULTS_ID: &str = "defaults";

/// One ranked provider of configuration values, seen at one section.
///
/// A source instance is a view: the root view covers top-level keys and
/// [`subsection`](ConfigSource::subsection) hands out further views that share
/// the same backing medium, so writes through one view are visible to all.
///
/// Sources are single-threaded; a backing store shared between views must not
/// be mutated from several threads without external synchronization.
pub trait ConfigSource {
    /// Name used to address this source in write-back.
    fn identifier(&self) -> &str;

    /// True if this section defines `key`, ignoring subsections and cascade.
    fn has(&self, key: &str) -> bool;

    /// Returns the raw value for `key`, or `KeyNotFound`.
    fn get(&self, key: &str) -> ConfigResult<ConfigValue>;

    /// Stores `value` in memory at this section.
    fn set(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()>;

    /// Keys of this section in source-defined order.
    fn keys(&self) -> Vec<String>;

    /// Names of sections nested directly below this one.
    fn subsections(&self) -> Vec<String> {
        Vec::new()
    }

    /// A view scoped to the nested section `name`.
    ///
    /// Returns `None` when the source has no nesting at this depth; such
    /// sources are left out of child nodes. A view may be returned for a
    /// section that does not exist yet, in which case it is empty until
    /// written to.
    fn subsection(&self, _name: &str) -> Option<Box<dyn ConfigSource>> {
        None
    }

    /// The authoritative target type for `key`, if this source knows one.
    fn type_hint(&self, _key: &str) -> Option<TypeHint> {
        None
    }

    /// True if this source can report a target type for `key`.
    fn typed(&self, key: &str) -> bool {
        self.type_hint(key).is_some()
    }

    /// Whether implicit write-back may target this source.
    fn writable(&self) -> bool {
        false
    }

    /// True for the top-level view of the backing medium.
    fn is_root(&self) -> bool {
        true
    }

    /// True if in-memory state differs from the persisted state.
    fn is_dirty(&self) -> bool {
        false
    }

    /// Persists in-memory state. Only valid on a root view.
    fn save(&mut self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Helpers over a precedence-ordered list of sources.
///
/// Lists are in construction order: lowest precedence first, highest last.
pub mod utils {
    use super::*;

    /// Index of the highest-precedence source defining `key`.
    pub fn first_defining(sources: &[Box<dyn ConfigSource>], key: &str) -> Option<usize> {
        sources.iter().rposition(|source| source.has(key))
    }

    /// Type hint for `key` from the highest-precedence typed source.
    pub fn type_hint(sources: &[Box<dyn ConfigSource>], key: &str) -> Option<TypeHint> {
        sources.iter().rev().find_map(|source| source.type_hint(key))
    }

    /// Union of all keys, first-seen order, duplicates suppressed.
    pub fn collect_keys(sources: &[Box<dyn ConfigSource>]) -> Vec<String> {
        let mut keys = IndexSet::new();
        for source in sources {
            keys.extend(source.keys());
        }
        keys.into_iter().collect()
    }

    /// Union of all subsection names, first-seen order.
    pub fn collect_subsections(sources: &[Box<dyn ConfigSource>]) -> Vec<String> {
        let mut names = IndexSet::new();
        for source in sources {
            names.extend(source.subsections());
        }
        names.into_iter().collect()
    }

    /// Position of the source called `identifier`.
    pub fn position_of(sources: &[Box<dyn ConfigSource>], identifier: &str) -> Option<usize> {
        sources
            .iter()
            .position(|source| source.identifier() == identifier)
    }
}
