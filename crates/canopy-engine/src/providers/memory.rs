//! In-memory provider implementation.
//!
//! The reference backend: implements every optional capability over a flat
//! path → properties map. All data is ephemeral. Thread-safe via an internal
//! `RwLock`; sessions of one provider share the same store, so transactional
//! isolation between sessions is intentionally not provided.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use canopy_types::{
    path, AuthenticationError, Capabilities, Identity, PersistenceError, Properties, QueryRow,
    Resource,
};

use crate::provider::{Params, ProviderSession, ResourceProvider};

/// The one query language the memory provider understands: a query matches
/// every resource whose path contains it as a substring.
pub const LANG_SUBSTRING: &str = "substring";

/// Who the memory provider authenticates.
#[derive(Debug, Clone, Default)]
pub enum AuthPolicy {
    /// Accept every identity.
    #[default]
    AcceptAll,
    /// Accept only administrative identities.
    AdminOnly,
    /// Reject the listed identity names.
    Deny(Vec<String>),
}

/// Statistics handle the memory provider adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Number of resources currently stored.
    pub resources: usize,
}

#[derive(Default)]
struct Store {
    entries: BTreeMap<String, Properties>,
    /// Last committed view; `entries` diverges from it until `commit`.
    baseline: BTreeMap<String, Properties>,
}

/// In-memory resource provider.
pub struct MemoryProvider {
    capabilities: Capabilities,
    policy: AuthPolicy,
    attributes: Vec<(String, serde_json::Value)>,
    auth_attempts: AtomicUsize,
    logouts: Arc<AtomicUsize>,
    store: Arc<RwLock<Store>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Create an empty provider with every capability enabled.
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::modifiable()
                .with_attributable()
                .with_queryable()
                .with_adaptable(),
            policy: AuthPolicy::AcceptAll,
            attributes: Vec::new(),
            auth_attempts: AtomicUsize::new(0),
            logouts: Arc::new(AtomicUsize::new(0)),
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.push((name.into(), value));
        self
    }

    /// Seed a resource as already-committed state.
    pub fn put(&self, raw_path: &str, properties: Properties) {
        let key = path::normalize(raw_path);
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.entries.insert(key.clone(), properties.clone());
        store.baseline.insert(key, properties);
    }

    /// The capability set this provider implements, for mount registration.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// How many times `authenticate` was called.
    pub fn auth_attempts(&self) -> usize {
        self.auth_attempts.load(Ordering::SeqCst)
    }

    /// How many times a handle of this provider was logged out.
    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    /// Number of resources currently stored.
    pub fn resource_count(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn accepts(&self, identity: &Identity) -> bool {
        match &self.policy {
            AuthPolicy::AcceptAll => true,
            AuthPolicy::AdminOnly => identity.admin,
            AuthPolicy::Deny(names) => !names.iter().any(|n| n == &identity.name),
        }
    }
}

impl ResourceProvider for MemoryProvider {
    fn authenticate(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn ProviderSession>, AuthenticationError> {
        self.auth_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.accepts(identity) {
            return Err(AuthenticationError {
                mount_path: String::new(),
                reason: format!("identity {:?} not accepted", identity.name),
            });
        }
        Ok(Box::new(MemorySession {
            capabilities: self.capabilities,
            attributes: self.attributes.clone(),
            store: Arc::clone(&self.store),
            logouts: Arc::clone(&self.logouts),
            live: AtomicBool::new(true),
        }))
    }
}

struct MemorySession {
    capabilities: Capabilities,
    attributes: Vec<(String, serde_json::Value)>,
    store: Arc<RwLock<Store>>,
    logouts: Arc<AtomicUsize>,
    live: AtomicBool,
}

impl MemorySession {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_modifiable(&self, target: &str) -> Result<(), PersistenceError> {
        if self.capabilities.modifiable {
            Ok(())
        } else {
            Err(PersistenceError::new(target, "read-only provider"))
        }
    }
}

/// Keys of the entries at or under `root`, in path order.
fn subtree_keys(entries: &BTreeMap<String, Properties>, root: &str) -> Vec<String> {
    entries
        .keys()
        .filter(|k| path::is_at_or_under(k, root))
        .cloned()
        .collect()
}

impl ProviderSession for MemorySession {
    fn get_resource(
        &self,
        path: &str,
        _parent_hint: Option<&Resource>,
        _params: Option<&Params>,
        _traversal: bool,
    ) -> Option<Resource> {
        self.read()
            .entries
            .get(path)
            .map(|props| Resource::new(path, props.clone()))
    }

    fn list_children(&self, parent: &Resource) -> Box<dyn Iterator<Item = Resource>> {
        let children: Vec<Resource> = self
            .read()
            .entries
            .iter()
            .filter(|(k, _)| path::parent(k) == Some(parent.path.as_str()))
            .map(|(k, props)| Resource::new(k.clone(), props.clone()))
            .collect();
        Box::new(children.into_iter())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }

    fn create(&self, path: &str, properties: Properties) -> Result<Resource, PersistenceError> {
        self.ensure_modifiable(path)?;
        let mut store = self.write();
        if store.entries.contains_key(path) {
            return Err(PersistenceError::new(path, "resource already exists"));
        }
        store.entries.insert(path.to_string(), properties.clone());
        Ok(Resource::new(path, properties))
    }

    fn delete(&self, path: &str) -> Result<(), PersistenceError> {
        self.ensure_modifiable(path)?;
        let mut store = self.write();
        let doomed = subtree_keys(&store.entries, path);
        if doomed.is_empty() {
            return Err(PersistenceError::new(path, "no such resource"));
        }
        for key in doomed {
            store.entries.remove(&key);
        }
        Ok(())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<bool, PersistenceError> {
        if !self.capabilities.modifiable {
            return Ok(false);
        }
        let mut store = self.write();
        let target_root = path::join(dst, path::name(src));
        let copied: Vec<(String, Properties)> = subtree_keys(&store.entries, src)
            .into_iter()
            .filter_map(|key| {
                let rebased = if key == src {
                    target_root.clone()
                } else {
                    format!("{target_root}{}", &key[src.len()..])
                };
                store.entries.get(&key).map(|p| (rebased, p.clone()))
            })
            .collect();
        if copied.is_empty() {
            return Ok(false);
        }
        store.entries.extend(copied);
        Ok(true)
    }

    fn move_to(&self, src: &str, dst: &str) -> Result<bool, PersistenceError> {
        if !self.copy(src, dst)? {
            return Ok(false);
        }
        let mut store = self.write();
        for key in subtree_keys(&store.entries, src) {
            store.entries.remove(&key);
        }
        Ok(true)
    }

    fn commit(&self) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.baseline = store.entries.clone();
        Ok(())
    }

    fn revert(&self) {
        let mut store = self.write();
        store.entries = store.baseline.clone();
    }

    fn has_changes(&self) -> bool {
        let store = self.read();
        store.entries != store.baseline
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|(n, _)| n.clone()).collect()
    }

    fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn supported_languages(&self) -> Vec<String> {
        vec![LANG_SUBSTRING.to_string()]
    }

    fn find_resources(&self, query: &str, language: &str) -> Box<dyn Iterator<Item = Resource>> {
        if language != LANG_SUBSTRING {
            return Box::new(std::iter::empty());
        }
        let hits: Vec<Resource> = self
            .read()
            .entries
            .iter()
            .filter(|(k, _)| k.contains(query))
            .map(|(k, props)| Resource::new(k.clone(), props.clone()))
            .collect();
        Box::new(hits.into_iter())
    }

    fn query_resources(&self, query: &str, language: &str) -> Box<dyn Iterator<Item = QueryRow>> {
        if language != LANG_SUBSTRING {
            return Box::new(std::iter::empty());
        }
        let rows: Vec<QueryRow> = self
            .read()
            .entries
            .iter()
            .filter(|(k, _)| k.contains(query))
            .map(|(k, props)| {
                let mut row = props.clone();
                row.insert("path".to_string(), serde_json::Value::String(k.clone()));
                row
            })
            .collect();
        Box::new(rows.into_iter())
    }

    fn adapt_to(&self, type_id: TypeId) -> Option<Box<dyn Any>> {
        if type_id == TypeId::of::<MemoryStats>() {
            Some(Box::new(MemoryStats {
                resources: self.read().entries.len(),
            }))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(type_name: &str) -> Properties {
        let mut p = Properties::new();
        p.insert("type".to_string(), type_name.into());
        p
    }

    fn session(provider: &MemoryProvider) -> Box<dyn ProviderSession> {
        provider.authenticate(&Identity::user("amy")).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let provider = MemoryProvider::new();
        provider.put("/a", props("root"));
        provider.put("/a/b", props("leaf"));

        let s = session(&provider);
        let r = s.get_resource("/a/b", None, None, false).unwrap();
        assert_eq!(r.resource_type(), Some("leaf"));
        assert!(s.get_resource("/a/missing", None, None, false).is_none());
    }

    #[test]
    fn test_list_children_direct_only() {
        let provider = MemoryProvider::new();
        provider.put("/a", props("d"));
        provider.put("/a/b", props("d"));
        provider.put("/a/c", props("d"));
        provider.put("/a/b/deep", props("d"));

        let s = session(&provider);
        let parent = s.get_resource("/a", None, None, false).unwrap();
        let names: Vec<String> = s
            .list_children(&parent)
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_create_delete_commit_revert() {
        let provider = MemoryProvider::new();
        provider.put("/a", props("d"));
        let s = session(&provider);

        s.create("/a/new", props("n")).unwrap();
        assert!(s.has_changes());
        assert!(s.create("/a/new", props("n")).is_err());

        s.revert();
        assert!(s.get_resource("/a/new", None, None, false).is_none());
        assert!(!s.has_changes());

        s.create("/a/new", props("n")).unwrap();
        s.commit().unwrap();
        assert!(!s.has_changes());

        s.delete("/a/new").unwrap();
        assert!(s.has_changes());
        assert!(s.delete("/a/new").is_err());
    }

    #[test]
    fn test_delete_removes_subtree() {
        let provider = MemoryProvider::new();
        provider.put("/a", props("d"));
        provider.put("/a/b", props("d"));
        provider.put("/a/b/c", props("d"));
        provider.put("/ab", props("d"));

        let s = session(&provider);
        s.delete("/a/b").unwrap();
        assert!(s.get_resource("/a/b/c", None, None, false).is_none());
        assert!(s.get_resource("/a", None, None, false).is_some());
        // sibling with a shared name prefix is untouched
        assert!(s.get_resource("/ab", None, None, false).is_some());
    }

    #[test]
    fn test_native_copy_and_move() {
        let provider = MemoryProvider::new();
        provider.put("/src/x", props("d"));
        provider.put("/src/x/y", props("d"));
        provider.put("/dst", props("d"));

        let s = session(&provider);
        assert!(s.copy("/src/x", "/dst").unwrap());
        assert!(s.get_resource("/dst/x/y", None, None, false).is_some());
        assert!(s.get_resource("/src/x", None, None, false).is_some());

        assert!(s.move_to("/src/x", "/dst/x").unwrap());
        assert!(s.get_resource("/dst/x/x/y", None, None, false).is_some());
        assert!(s.get_resource("/src/x", None, None, false).is_none());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let provider = MemoryProvider::new().with_capabilities(Capabilities::read_only());
        provider.put("/a", props("d"));
        let s = session(&provider);
        assert!(s.create("/a/x", Properties::new()).is_err());
        assert!(s.delete("/a").is_err());
        assert!(!s.copy("/a", "/b").unwrap());
    }

    #[test]
    fn test_substring_queries() {
        let provider = MemoryProvider::new();
        provider.put("/content/report", props("d"));
        provider.put("/content/image", props("d"));

        let s = session(&provider);
        assert_eq!(s.supported_languages(), vec![LANG_SUBSTRING.to_string()]);
        let found: Vec<String> = s
            .find_resources("report", LANG_SUBSTRING)
            .map(|r| r.path)
            .collect();
        assert_eq!(found, vec!["/content/report".to_string()]);
        assert_eq!(s.find_resources("report", "sql").count(), 0);

        let rows: Vec<QueryRow> = s.query_resources("image", LANG_SUBSTRING).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("path").and_then(|v| v.as_str()),
            Some("/content/image")
        );
    }

    #[test]
    fn test_adapts_to_stats() {
        let provider = MemoryProvider::new();
        provider.put("/a", props("d"));
        provider.put("/b", props("d"));
        let s = session(&provider);

        let stats = s.adapt_to(TypeId::of::<MemoryStats>()).unwrap();
        let stats = stats.downcast::<MemoryStats>().unwrap();
        assert_eq!(stats.resources, 2);
        assert!(s.adapt_to(TypeId::of::<String>()).is_none());
    }

    #[test]
    fn test_auth_policy_and_logout() {
        let provider = MemoryProvider::new().with_auth_policy(AuthPolicy::Deny(vec!["eve".into()]));
        assert!(provider.authenticate(&Identity::user("eve")).is_err());
        let s = provider.authenticate(&Identity::user("amy")).unwrap();
        assert_eq!(provider.auth_attempts(), 2);

        assert!(s.is_live());
        s.logout();
        assert!(!s.is_live());
    }
}
