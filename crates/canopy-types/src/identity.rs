//! Caller identities.

use serde::{Deserialize, Serialize};

/// The identity a session is opened with.
///
/// Providers authenticate against this; the engine itself only distinguishes
/// administrative identities (which may resolve structural metadata directly)
/// from regular ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Caller name, opaque to the engine.
    pub name: String,
    /// True for privileged/administrative callers.
    pub admin: bool,
}

impl Identity {
    /// A regular, unprivileged identity.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: false,
        }
    }

    /// An administrative identity.
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: true,
        }
    }
}
