//! Error taxonomy for federation operations.

use thiserror::Error;

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// A provider rejected the session's identity.
///
/// Locally recoverable: the engine treats the provider as absent for the
/// session and continues with fallback logic. It only reaches the caller
/// when the rejecting provider was the sole way to satisfy a required
/// operation.
#[derive(Debug, Clone, Error)]
#[error("authentication refused by mount at {mount_path}: {reason}")]
pub struct AuthenticationError {
    /// Path of the mount whose provider rejected the identity.
    pub mount_path: String,
    /// Provider-supplied reason.
    pub reason: String,
}

/// A provider accepted authentication but failed a structural operation.
#[derive(Debug, Clone, Error)]
#[error("persistence failure at {path}: {reason}")]
pub struct PersistenceError {
    /// Path the failed operation targeted.
    pub path: String,
    /// Provider-supplied reason.
    pub reason: String,
}

impl PersistenceError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Federation operation errors.
#[derive(Debug, Clone, Error)]
pub enum FederationError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("unsupported operation: {operation} at {path}")]
    Unsupported { operation: String, path: String },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("session is closed")]
    SessionClosed,
}

impl FederationError {
    pub fn unsupported(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FederationError::unsupported("create", "/content/assets/x");
        assert_eq!(
            err.to_string(),
            "unsupported operation: create at /content/assets/x"
        );

        let err: FederationError = PersistenceError::new("/a", "disk full").into();
        assert_eq!(err.to_string(), "persistence failure at /a: disk full");
    }
}
