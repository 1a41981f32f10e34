//! Capability flags advertised by a mount.

use serde::{Deserialize, Serialize};

/// The optional operations a mounted provider supports.
///
/// The engine checks these flags before dispatch; a provider is never asked
/// for an operation its mount did not advertise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Supports create/delete/copy/move/commit/revert.
    pub modifiable: bool,
    /// Supports attribute name/value lookup.
    pub attributable: bool,
    /// Supports language-tagged find/query.
    pub queryable: bool,
    /// Supports adaptation to provider-defined types.
    pub adaptable: bool,
}

impl Capabilities {
    /// No optional capabilities: a plain read-only provider.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// A provider that supports structural writes.
    pub fn modifiable() -> Self {
        Self {
            modifiable: true,
            ..Self::default()
        }
    }

    pub fn with_attributable(mut self) -> Self {
        self.attributable = true;
        self
    }

    pub fn with_queryable(mut self) -> Self {
        self.queryable = true;
        self
    }

    pub fn with_adaptable(mut self) -> Self {
        self.adaptable = true;
        self
    }
}
