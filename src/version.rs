//! Version labels and the per-build override tables that pick them.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A label identifying one alternative of a versioned alias, e.g. "2.1".
/// Compared, ordered, and hashed by label text.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Arc<str>);

impl Version {
    pub fn of(label: &str) -> Version {
        Version(Arc::from(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({:?})", &*self.0)
    }
}

/// A named override table choosing specific versions for specific aliases
/// for one build invocation.  Built once from configuration, read-only
/// afterwards; compared by content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VersionUniverse {
    versions: FxHashMap<String, Version>,
}

impl VersionUniverse {
    pub fn of(entries: impl IntoIterator<Item = (String, Version)>) -> VersionUniverse {
        VersionUniverse {
            versions: entries.into_iter().collect(),
        }
    }

    /// The version this universe chooses for the given alias label, if any.
    pub fn get(&self, alias: &str) -> Option<&Version> {
        self.versions.get(alias)
    }
}

/// The full version-selection configuration for one invocation: universe
/// name to universe.  Compared by content for cache keying.
pub type VersionUniverses = FxHashMap<String, VersionUniverse>;
