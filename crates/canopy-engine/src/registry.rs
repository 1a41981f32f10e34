//! Mount registration and the per-generation provider storage snapshot.
//!
//! [`Federation`] owns the process-wide mount table. Every registration or
//! removal rebuilds an immutable [`ProviderStorage`] snapshot (path trie plus
//! rank-ordered capability lists) and swaps it in under a short write lock;
//! resolution always reads a single coherent snapshot, never a
//! partially-updated table.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use canopy_types::{path, Capabilities, Identity};

use crate::provider::ResourceProvider;
use crate::session::Session;
use crate::tree::PathTree;

/// A provider's claim on a subtree of the federated namespace.
pub struct Mount {
    /// Absolute path the provider is mounted at.
    pub path: String,
    /// Tie-break rank for claims on the same exact path; higher wins.
    pub rank: i32,
    /// Optional operations the provider supports.
    pub capabilities: Capabilities,
    /// The provider itself.
    pub provider: Arc<dyn ResourceProvider>,
}

impl Mount {
    pub fn new(
        path: impl Into<String>,
        capabilities: Capabilities,
        provider: Arc<dyn ResourceProvider>,
    ) -> Self {
        Self {
            path: path.into(),
            rank: 0,
            capabilities,
            provider,
        }
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }
}

/// Identifies one accepted mount for the lifetime of its registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(pub(crate) u64);

/// An accepted mount as held by the table and the trie.
pub struct MountEntry {
    pub id: MountId,
    /// Normalized mount path.
    pub path: String,
    pub rank: i32,
    pub capabilities: Capabilities,
    pub provider: Arc<dyn ResourceProvider>,
}

/// Immutable per-generation view of the registered mounts.
///
/// Holds the path trie and the capability-filtered mount lists, each in rank
/// order (higher rank first, registration order stable), precomputed so that
/// fan-out operations never re-scan the table.
pub struct ProviderStorage {
    tree: PathTree,
    all: Vec<Arc<MountEntry>>,
    attributable: Vec<Arc<MountEntry>>,
    queryable: Vec<Arc<MountEntry>>,
    adaptable: Vec<Arc<MountEntry>>,
}

impl ProviderStorage {
    fn build(entries: &[Arc<MountEntry>]) -> Self {
        let mut all = entries.to_vec();
        // higher rank first; MountId preserves registration order for ties
        all.sort_by(|a, b| b.rank.cmp(&a.rank).then(a.id.0.cmp(&b.id.0)));
        let filtered = |pred: fn(&Capabilities) -> bool| -> Vec<Arc<MountEntry>> {
            all.iter()
                .filter(|e| pred(&e.capabilities))
                .cloned()
                .collect()
        };
        Self {
            tree: PathTree::build(entries),
            attributable: filtered(|c| c.attributable),
            queryable: filtered(|c| c.queryable),
            adaptable: filtered(|c| c.adaptable),
            all,
        }
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    /// All mounts, rank order.
    pub fn mounts(&self) -> &[Arc<MountEntry>] {
        &self.all
    }

    pub fn attributable(&self) -> &[Arc<MountEntry>] {
        &self.attributable
    }

    pub fn queryable(&self) -> &[Arc<MountEntry>] {
        &self.queryable
    }

    pub fn adaptable(&self) -> &[Arc<MountEntry>] {
        &self.adaptable
    }
}

struct TableInner {
    entries: Vec<Arc<MountEntry>>,
    next_id: u64,
    storage: Arc<ProviderStorage>,
}

/// The federation: mount registration plus session creation.
pub struct Federation {
    inner: RwLock<TableInner>,
}

impl Default for Federation {
    fn default() -> Self {
        Self::new()
    }
}

impl Federation {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner {
                entries: Vec::new(),
                next_id: 0,
                storage: Arc::new(ProviderStorage::build(&[])),
            }),
        }
    }

    /// Register a mount. Returns `false` if the exact path is already
    /// claimed at an equal or higher rank; the duplicate is ignored.
    ///
    /// A higher-ranked registration replaces the standing claim. Equal
    /// ranks are registration-order stable: the first registrant wins.
    pub fn register_mount(&self, mount: Mount) -> bool {
        let mount_path = path::normalize(&mount.path);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = inner.entries.iter().position(|e| e.path == mount_path) {
            if mount.rank > inner.entries[pos].rank {
                debug!(path = %mount_path, rank = mount.rank, "mount replaces lower-ranked claim");
                inner.entries.remove(pos);
            } else {
                warn!(
                    path = %mount_path,
                    rank = mount.rank,
                    standing_rank = inner.entries[pos].rank,
                    "mount rejected: exact path already claimed"
                );
                return false;
            }
        }
        let id = MountId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push(Arc::new(MountEntry {
            id,
            path: mount_path,
            rank: mount.rank,
            capabilities: mount.capabilities,
            provider: mount.provider,
        }));
        inner.storage = Arc::new(ProviderStorage::build(&inner.entries));
        true
    }

    /// Remove the mount at exactly `path`. Returns `false` if none exists.
    pub fn unregister_mount(&self, path: &str) -> bool {
        let mount_path = path::normalize(path);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(pos) = inner.entries.iter().position(|e| e.path == mount_path) else {
            return false;
        };
        inner.entries.remove(pos);
        inner.storage = Arc::new(ProviderStorage::build(&inner.entries));
        true
    }

    /// The current storage snapshot.
    pub fn storage(&self) -> Arc<ProviderStorage> {
        Arc::clone(
            &self
                .inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .storage,
        )
    }

    /// Open a session for `identity`.
    ///
    /// No provider is authenticated up front; each is authenticated lazily
    /// on the first operation that touches it.
    pub fn open_session(self: &Arc<Self>, identity: Identity) -> Session {
        Session::new(Arc::clone(self), identity)
    }
}
