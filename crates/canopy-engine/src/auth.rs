//! Per-session provider authentication and handle caching.
//!
//! Each session owns one `Authenticator`. The first operation that touches a
//! mount authenticates its provider; the outcome, success or failure, is
//! cached so a mount is authenticated at most once per session and a failed
//! authentication is never retried. Creation runs under the cache mutex, so
//! concurrent operations cannot race two handles into existence for the same
//! mount.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use canopy_types::{AuthenticationError, Identity};

use crate::provider::ProviderSession;
use crate::registry::{MountEntry, MountId};

type AuthOutcome = Result<Arc<dyn ProviderSession>, AuthenticationError>;

#[derive(Default)]
struct AuthState {
    cache: HashMap<MountId, AuthOutcome>,
    /// Successfully authenticated handles, in first-use order.
    used: Vec<(Arc<MountEntry>, Arc<dyn ProviderSession>)>,
}

/// The session-scoped handle cache.
pub struct Authenticator {
    identity: Identity,
    state: Mutex<AuthState>,
}

impl Authenticator {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// The authenticated handle for `mount`, creating it on first use.
    ///
    /// Failures are cached and returned verbatim on every later call.
    pub fn session_for(&self, mount: &Arc<MountEntry>) -> AuthOutcome {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = state.cache.get(&mount.id) {
            return outcome.clone();
        }
        // check-then-create stays under the lock: authentication is the one
        // mutation point that must not run twice for a (mount, session) pair
        let outcome = match mount.provider.authenticate(&self.identity) {
            Ok(handle) => {
                let handle: Arc<dyn ProviderSession> = Arc::from(handle);
                state.used.push((Arc::clone(mount), Arc::clone(&handle)));
                Ok(handle)
            }
            Err(err) => {
                debug!(mount = %mount.path, %err, "provider rejected identity; treating mount as absent");
                Err(err)
            }
        };
        state.cache.insert(mount.id, outcome.clone());
        outcome
    }

    /// Best-effort variant of [`Self::session_for`]: `None` on failure.
    pub fn try_session_for(&self, mount: &Arc<MountEntry>) -> Option<Arc<dyn ProviderSession>> {
        self.session_for(mount).ok()
    }

    /// Every handle this session actually authenticated, in first-use order.
    pub fn all_used(&self) -> Vec<(Arc<MountEntry>, Arc<dyn ProviderSession>)> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .used
            .clone()
    }

    /// Authenticate each of `mounts` best-effort, skipping failures, and
    /// return the handles in the given (rank) order.
    pub fn all_best_effort(&self, mounts: &[Arc<MountEntry>]) -> Vec<Arc<dyn ProviderSession>> {
        mounts
            .iter()
            .filter_map(|m| self.try_session_for(m))
            .collect()
    }
}
