//! The federation session: the unified view over all mounted providers.
//!
//! A [`Session`] belongs to exactly one logical caller. It routes every
//! operation through the current [`ProviderStorage`](crate::registry::ProviderStorage)
//! snapshot: the path trie picks the most specific mount, the authenticator
//! supplies (and caches) that mount's authenticated handle, and the provider
//! is delegated to. Where no provider yields a result, known intermediate
//! paths are kept walkable with synthetic resources.
//!
//! A session is not safe for concurrent use by multiple threads; callers
//! needing concurrency open independent sessions.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use canopy_types::{
    path, FederationError, FederationResult, Identity, PersistenceError, Properties, QueryRow,
    Resource,
};

use crate::auth::Authenticator;
use crate::iter::{ChainedIter, UniqueResources};
use crate::provider::{Params, ProviderSession};
use crate::registry::Federation;
use crate::tree::TreeNode;

/// A per-caller view of the federated tree.
pub struct Session {
    federation: Arc<Federation>,
    identity: Identity,
    auth: Authenticator,
    closed: AtomicBool,
    /// Administrative session opened lazily for structural metadata lookups
    /// on behalf of unprivileged callers.
    type_session: Mutex<Option<Box<Session>>>,
}

impl Session {
    pub(crate) fn new(federation: Arc<Federation>, identity: Identity) -> Self {
        let auth = Authenticator::new(identity.clone());
        Self {
            federation,
            identity,
            auth,
            closed: AtomicBool::new(false),
            type_session: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> FederationResult<()> {
        if self.is_closed() {
            Err(FederationError::SessionClosed)
        } else {
            Ok(())
        }
    }

    // ── Read path ──────────────────────────────────────────────────────

    /// Resolve the resource at `path`, synthesizing a placeholder for known
    /// intermediate paths no provider owns.
    pub fn get_resource(&self, path: &str) -> FederationResult<Option<Resource>> {
        self.lookup(path, None, None, false)
    }

    /// Full-form resolution.
    ///
    /// `traversal` marks a structural lookup performed while walking the
    /// tree (finding an ancestor); such lookups never synthesize
    /// placeholders, so low-level traversal is not misled by nodes that
    /// exist only as mount-path scaffolding.
    pub fn lookup(
        &self,
        raw_path: &str,
        parent_hint: Option<&Resource>,
        params: Option<&Params>,
        traversal: bool,
    ) -> FederationResult<Option<Resource>> {
        self.ensure_open()?;
        if !path::is_absolute(raw_path) {
            debug!(path = raw_path, "not absolute");
            return Ok(None);
        }
        Ok(self.lookup_internal(&path::normalize(raw_path), parent_hint, params, traversal))
    }

    fn lookup_internal(
        &self,
        path: &str,
        parent_hint: Option<&Resource>,
        params: Option<&Params>,
        traversal: bool,
    ) -> Option<Resource> {
        let storage = self.federation.storage();
        if let Some(entry) = storage.tree().best_match(path) {
            if let Some(handle) = self.auth.try_session_for(entry) {
                if let Some(resource) = handle.get_resource(path, parent_hint, params, traversal) {
                    return Some(resource);
                }
            }
        }
        // A mount at /a/b/c makes /a and /a/b known intermediate paths even
        // when no provider returns a resource for them.
        if !traversal && storage.tree().is_known_path(path) {
            debug!(path, "synthesized placeholder");
            return Some(Resource::synthetic(path));
        }
        debug!(path, "no resource");
        None
    }

    /// The parent of `child`, from the owning provider or, for known
    /// intermediate parent paths, as a synthetic placeholder.
    pub fn get_parent(&self, child: &Resource) -> FederationResult<Option<Resource>> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        if let Some(entry) = storage.tree().best_match(&child.path) {
            if let Some(handle) = self.auth.try_session_for(entry) {
                if let Some(parent) = handle.get_parent(child) {
                    return Ok(Some(parent));
                }
            }
        }
        match child.parent_path() {
            Some(parent_path) if storage.tree().is_known_path(parent_path) => {
                Ok(Some(Resource::synthetic(parent_path)))
            }
            _ => Ok(None),
        }
    }

    /// Lazily merge the children of `parent` from every contributing source:
    /// the provider owning `parent`'s path, providers mounted directly at a
    /// child path, and synthetic placeholders for deeper mount scaffolding.
    ///
    /// First seen wins by name, real resources before synthetic ones. The
    /// iterator is finite and single-pass; a fresh call re-evaluates.
    pub fn list_children(
        &self,
        parent: &Resource,
    ) -> FederationResult<Box<dyn Iterator<Item = Resource> + '_>> {
        self.ensure_open()?;
        Ok(Box::new(LazyChildren {
            session: self,
            parent: parent.clone(),
            inner: None,
        }))
    }

    fn build_children(&self, parent: &Resource) -> UniqueResources<ChainedIter<Resource>> {
        let storage = self.federation.storage();
        let mut parts: Vec<Box<dyn Iterator<Item = Resource>>> = Vec::new();

        // children reported by the provider owning the parent path
        if let Some(entry) = storage.tree().best_match(&parent.path) {
            if let Some(handle) = self.auth.try_session_for(entry) {
                parts.push(handle.list_children(parent));
            }
        }

        // providers mounted directly at a child path, and synthetic entries
        // for child segments that only lead to deeper mounts
        let mut visited = HashSet::new();
        let mut mounted = Vec::new();
        let mut synthetic = Vec::new();
        if let Some(node) = storage.tree().node_at(&parent.path) {
            for (name, child) in node.children() {
                let child_path = path::join(&parent.path, name);
                match child.mount() {
                    Some(entry) => {
                        let resolved = self
                            .auth
                            .try_session_for(entry)
                            .and_then(|h| h.get_resource(&child_path, Some(parent), None, false));
                        match resolved {
                            Some(resource) => mounted.push(resource),
                            // The mounted provider has nothing here. Keep the
                            // segment walkable if it is a leaf; if deeper
                            // mounts exist beneath it the name is suppressed
                            // so no other source claims it.
                            None if child.has_children() => {
                                visited.insert(name.clone());
                            }
                            None => synthetic.push(Resource::synthetic(child_path)),
                        }
                    }
                    None => synthetic.push(Resource::synthetic(child_path)),
                }
            }
        }
        if !mounted.is_empty() {
            parts.push(Box::new(mounted.into_iter()));
        }
        if !synthetic.is_empty() {
            parts.push(Box::new(synthetic.into_iter()));
        }
        UniqueResources::new(ChainedIter::new(parts), visited)
    }

    // ── Write path ─────────────────────────────────────────────────────

    /// Create a resource at `path`.
    ///
    /// Routes to the most specific mount covering `path` only if that mount
    /// is itself modifiable; a read-only mount nested above a writable one
    /// is not skipped in favor of the ancestor.
    pub fn create(&self, raw_path: &str, properties: Properties) -> FederationResult<Resource> {
        self.ensure_open()?;
        let target = path::normalize(raw_path);
        let storage = self.federation.storage();
        if let Some(entry) = storage.tree().best_match(&target) {
            if entry.capabilities.modifiable {
                // the sole writable route: an auth failure here surfaces
                let handle = self.auth.session_for(entry)?;
                return Ok(handle.create(&target, properties)?);
            }
        }
        Err(FederationError::unsupported("create", target))
    }

    /// Delete `resource`.
    pub fn delete(&self, resource: &Resource) -> FederationResult<()> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        if let Some(entry) = storage.tree().best_match(&resource.path) {
            if entry.capabilities.modifiable {
                let handle = self.auth.session_for(entry)?;
                handle.delete(&resource.path)?;
                return Ok(());
            }
        }
        Err(FederationError::unsupported("delete", resource.path.as_str()))
    }

    /// Copy the subtree at `src` under `dst`; returns the new subtree root.
    pub fn copy(&self, src: &str, dst: &str) -> FederationResult<Resource> {
        self.ensure_open()?;
        let src = path::normalize(src);
        let dst = path::normalize(dst);
        if let Some(handle) = self.native_provider_for(&src, &dst)? {
            if handle.copy(&src, &dst)? {
                return self.resolve_transfer_target(&src, &dst);
            }
        }
        self.copy_tree(&src, &dst, false)
    }

    /// Move the subtree at `src` under `dst`; returns the new subtree root.
    ///
    /// The generic fallback never deletes `src` unless every destination
    /// create succeeded.
    pub fn move_resource(&self, src: &str, dst: &str) -> FederationResult<Resource> {
        self.ensure_open()?;
        let src = path::normalize(src);
        let dst = path::normalize(dst);
        if let Some(handle) = self.native_provider_for(&src, &dst)? {
            if handle.move_to(&src, &dst)? {
                return self.resolve_transfer_target(&src, &dst);
            }
        }
        self.copy_tree(&src, &dst, true)
    }

    fn resolve_transfer_target(&self, src: &str, dst: &str) -> FederationResult<Resource> {
        let target = path::join(dst, path::name(src));
        self.lookup_internal(&target, None, None, false)
            .ok_or_else(|| {
                PersistenceError::new(target.as_str(), "transferred resource did not resolve").into()
            })
    }

    /// The single handle eligible for a native copy/move: both ends resolve
    /// through the same authenticated provider and no other mount sits
    /// strictly beneath either path.
    ///
    /// Fails if either end does not resolve at all; returns `Ok(None)` when
    /// the optimization merely cannot be proven safe.
    fn native_provider_for(
        &self,
        src: &str,
        dst: &str,
    ) -> FederationResult<Option<Arc<dyn ProviderSession>>> {
        let storage = self.federation.storage();
        let resolve_end = |path: &str, what: &str| -> FederationResult<Arc<dyn ProviderSession>> {
            let handle = storage
                .tree()
                .best_match(path)
                .and_then(|entry| self.auth.try_session_for(entry))
                .ok_or_else(|| PersistenceError::new(path, format!("{what} does not exist")))?;
            if handle.get_resource(path, None, None, false).is_none() {
                return Err(PersistenceError::new(path, format!("{what} does not exist")).into());
            }
            Ok(handle)
        };

        let src_handle = resolve_end(src, "source resource")?;
        let dst_handle = resolve_end(dst, "destination resource")?;

        if !Arc::ptr_eq(&src_handle, &dst_handle) {
            return Ok(None);
        }
        let sub_mounted = |path: &str| {
            storage
                .tree()
                .node_at(path)
                .is_some_and(|node| self.has_sub_providers(node))
        };
        if sub_mounted(src) || sub_mounted(dst) {
            return Ok(None);
        }
        Ok(Some(src_handle))
    }

    /// True if any descendant of `node` carries a mount whose provider
    /// accepts this session's identity.
    fn has_sub_providers(&self, node: &TreeNode) -> bool {
        node.children().values().any(|child| {
            child
                .mount()
                .is_some_and(|entry| self.auth.try_session_for(entry).is_some())
                || self.has_sub_providers(child)
        })
    }

    fn copy_tree(&self, src: &str, dst: &str, delete_source: bool) -> FederationResult<Resource> {
        let src_resource = self
            .lookup_internal(src, None, None, false)
            .ok_or_else(|| PersistenceError::new(src, "source resource does not exist"))?;

        let mut created: Vec<Resource> = Vec::new();
        let outcome = self
            .copy_subtree(&src_resource, dst, &mut created)
            .and_then(|_| {
                if delete_source {
                    self.delete(&src_resource)
                } else {
                    Ok(())
                }
            });

        match outcome {
            Ok(()) => created.first().cloned().ok_or_else(|| {
                PersistenceError::new(dst, "copy produced no resources").into()
            }),
            Err(err) => {
                // undo in reverse creation order, children before parents;
                // cleanup failures must not mask the original error
                for resource in created.iter().rev() {
                    if let Err(cleanup) = self.delete(resource) {
                        warn!(path = %resource.path, error = %cleanup, "rollback delete failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Depth-first copy, parent before children, recording every created
    /// resource in creation order.
    fn copy_subtree(
        &self,
        src: &Resource,
        dst_parent: &str,
        created: &mut Vec<Resource>,
    ) -> FederationResult<()> {
        let target = path::join(dst_parent, src.name());
        created.push(self.create(&target, src.properties.clone())?);
        let children: Vec<Resource> = self.list_children(src)?.collect();
        for child in children {
            self.copy_subtree(&child, &target, created)?;
        }
        Ok(())
    }

    // ── Transaction fan-out over used modifiable handles ───────────────

    /// Persist pending changes on every used modifiable provider.
    pub fn commit(&self) -> FederationResult<()> {
        self.ensure_open()?;
        for (entry, handle) in self.auth.all_used() {
            if entry.capabilities.modifiable {
                handle.commit()?;
            }
        }
        Ok(())
    }

    /// Discard pending changes on every used modifiable provider.
    pub fn revert(&self) -> FederationResult<()> {
        self.ensure_open()?;
        for (entry, handle) in self.auth.all_used() {
            if entry.capabilities.modifiable {
                handle.revert();
            }
        }
        Ok(())
    }

    /// True if any used modifiable provider has uncommitted changes.
    pub fn has_changes(&self) -> FederationResult<bool> {
        self.ensure_open()?;
        Ok(self
            .auth
            .all_used()
            .iter()
            .any(|(entry, handle)| entry.capabilities.modifiable && handle.has_changes()))
    }

    // ── Best-effort capability fan-outs ────────────────────────────────

    /// Union of all attribute names, mount rank order, first occurrence kept.
    pub fn attribute_names(&self) -> FederationResult<Vec<String>> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for handle in self.auth.all_best_effort(storage.attributable()) {
            for name in handle.attribute_names() {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// First non-null value of the named attribute, mount rank order.
    pub fn attribute(&self, name: &str) -> FederationResult<Option<serde_json::Value>> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        for handle in self.auth.all_best_effort(storage.attributable()) {
            if let Some(value) = handle.attribute(name) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Union of the query languages supported across queryable mounts.
    pub fn supported_languages(&self) -> FederationResult<Vec<String>> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        let mut seen = HashSet::new();
        let mut languages = Vec::new();
        for handle in self.auth.all_best_effort(storage.queryable()) {
            for language in handle.supported_languages() {
                if seen.insert(language.clone()) {
                    languages.push(language);
                }
            }
        }
        Ok(languages)
    }

    fn queryable_handles(&self, language: &str) -> Vec<Arc<dyn ProviderSession>> {
        let storage = self.federation.storage();
        self.auth
            .all_best_effort(storage.queryable())
            .into_iter()
            .filter(|h| h.supported_languages().iter().any(|l| l == language))
            .collect()
    }

    /// Chain the resources found by every provider supporting `language`.
    pub fn find_resources(
        &self,
        query: &str,
        language: &str,
    ) -> FederationResult<Box<dyn Iterator<Item = Resource>>> {
        self.ensure_open()?;
        let parts: Vec<Box<dyn Iterator<Item = Resource>>> = self
            .queryable_handles(language)
            .into_iter()
            .map(|h| h.find_resources(query, language))
            .collect();
        Ok(Box::new(ChainedIter::new(parts)))
    }

    /// Chain the structured rows returned by every provider supporting
    /// `language`.
    pub fn query_resources(
        &self,
        query: &str,
        language: &str,
    ) -> FederationResult<Box<dyn Iterator<Item = QueryRow>>> {
        self.ensure_open()?;
        let parts: Vec<Box<dyn Iterator<Item = QueryRow>>> = self
            .queryable_handles(language)
            .into_iter()
            .map(|h| h.query_resources(query, language))
            .collect();
        Ok(Box::new(ChainedIter::new(parts)))
    }

    /// First adaptable provider able to produce a `T`, mount rank order.
    pub fn adapt_to<T: Any>(&self) -> FederationResult<Option<Box<T>>> {
        self.ensure_open()?;
        let storage = self.federation.storage();
        for handle in self.auth.all_best_effort(storage.adaptable()) {
            if let Some(adapted) = handle.adapt_to(TypeId::of::<T>()) {
                if let Ok(typed) = adapted.downcast::<T>() {
                    return Ok(Some(typed));
                }
            }
        }
        Ok(None)
    }

    // ── Structural metadata ────────────────────────────────────────────

    /// The super type recorded at the given absolute resource-type path.
    ///
    /// Unprivileged sessions resolve the type path through a lazily opened
    /// administrative session; any failure there degrades to `None`.
    pub fn super_type_of(&self, type_path: &str) -> Option<String> {
        if self.is_closed() || !path::is_absolute(type_path) {
            return None;
        }
        let type_path = path::normalize(type_path);
        if self.identity.admin {
            return self
                .lookup_internal(&type_path, None, None, false)
                .and_then(|r| r.super_type().map(str::to_owned));
        }
        let mut guard = self
            .type_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let type_session = guard.get_or_insert_with(|| {
            Box::new(
                self.federation
                    .open_session(Identity::admin("canopy-structural")),
            )
        });
        type_session
            .get_resource(&type_path)
            .ok()
            .flatten()
            .and_then(|r| r.super_type().map(str::to_owned))
    }

    /// The parent type of `resource`: its own super type, or the super type
    /// recorded at its resource-type path.
    pub fn parent_type_of(&self, resource: &Resource) -> Option<String> {
        resource
            .super_type()
            .map(str::to_owned)
            .or_else(|| resource.resource_type().and_then(|t| self.super_type_of(t)))
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Refresh every used handle.
    pub fn refresh(&self) -> FederationResult<()> {
        self.ensure_open()?;
        for (_, handle) in self.auth.all_used() {
            handle.refresh();
        }
        Ok(())
    }

    /// True while the session is open and every used handle is live.
    pub fn is_live(&self) -> bool {
        !self.is_closed() && self.auth.all_used().iter().all(|(_, h)| h.is_live())
    }

    /// Close the session: idempotent; logs out each used handle exactly
    /// once and releases the structural-metadata session if one was opened.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            for (_, handle) in self.auth.all_used() {
                handle.logout();
            }
            let type_session = self
                .type_session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(session) = type_session {
                // the backing providers may already be torn down; nothing
                // from this release is allowed to surface
                session.close();
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

struct LazyChildren<'a> {
    session: &'a Session,
    parent: Resource,
    inner: Option<UniqueResources<ChainedIter<Resource>>>,
}

impl Iterator for LazyChildren<'_> {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        if self.inner.is_none() {
            self.inner = Some(self.session.build_children(&self.parent));
        }
        self.inner.as_mut().and_then(|it| it.next())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::provider::ResourceProvider;
    use crate::providers::memory::{AuthPolicy, MemoryProvider};
    use crate::registry::Mount;
    use canopy_types::{AuthenticationError, Capabilities};

    fn props(type_name: &str) -> Properties {
        let mut p = Properties::new();
        p.insert("type".to_string(), type_name.into());
        p
    }

    /// Provider whose `create` succeeds a fixed number of times and then
    /// fails, for exercising copy/move rollback.
    struct FlakyProvider {
        store: Arc<Mutex<FlakyStore>>,
    }

    struct FlakyStore {
        entries: BTreeMap<String, Properties>,
        creates_left: Option<usize>,
    }

    impl FlakyProvider {
        fn new(create_budget: Option<usize>) -> Self {
            Self {
                store: Arc::new(Mutex::new(FlakyStore {
                    entries: BTreeMap::new(),
                    creates_left: create_budget,
                })),
            }
        }

        fn put(&self, path: &str) {
            self.store
                .lock()
                .unwrap()
                .entries
                .insert(path.to_string(), Properties::new());
        }

        fn contains(&self, path: &str) -> bool {
            self.store.lock().unwrap().entries.contains_key(path)
        }
    }

    impl ResourceProvider for FlakyProvider {
        fn authenticate(
            &self,
            _identity: &Identity,
        ) -> Result<Box<dyn ProviderSession>, AuthenticationError> {
            Ok(Box::new(FlakySession {
                store: Arc::clone(&self.store),
            }))
        }
    }

    struct FlakySession {
        store: Arc<Mutex<FlakyStore>>,
    }

    impl ProviderSession for FlakySession {
        fn get_resource(
            &self,
            path: &str,
            _parent_hint: Option<&Resource>,
            _params: Option<&Params>,
            _traversal: bool,
        ) -> Option<Resource> {
            self.store
                .lock()
                .unwrap()
                .entries
                .get(path)
                .map(|p| Resource::new(path, p.clone()))
        }

        fn list_children(&self, parent: &Resource) -> Box<dyn Iterator<Item = Resource>> {
            let children: Vec<Resource> = self
                .store
                .lock()
                .unwrap()
                .entries
                .iter()
                .filter(|(k, _)| canopy_types::path::parent(k) == Some(parent.path.as_str()))
                .map(|(k, p)| Resource::new(k.clone(), p.clone()))
                .collect();
            Box::new(children.into_iter())
        }

        fn create(
            &self,
            path: &str,
            properties: Properties,
        ) -> Result<Resource, PersistenceError> {
            let mut store = self.store.lock().unwrap();
            if let Some(left) = store.creates_left.as_mut() {
                if *left == 0 {
                    return Err(PersistenceError::new(path, "create budget exhausted"));
                }
                *left -= 1;
            }
            store.entries.insert(path.to_string(), properties.clone());
            Ok(Resource::new(path, properties))
        }

        fn delete(&self, path: &str) -> Result<(), PersistenceError> {
            let mut store = self.store.lock().unwrap();
            let doomed: Vec<String> = store
                .entries
                .keys()
                .filter(|k| canopy_types::path::is_at_or_under(k, path))
                .cloned()
                .collect();
            if doomed.is_empty() {
                return Err(PersistenceError::new(path, "no such resource"));
            }
            for key in doomed {
                store.entries.remove(&key);
            }
            Ok(())
        }
    }

    fn federation() -> Arc<Federation> {
        Arc::new(Federation::new())
    }

    fn seeded_source() -> Arc<MemoryProvider> {
        let src = Arc::new(MemoryProvider::new());
        src.put("/src", props("root"));
        src.put("/src/a", props("node"));
        src.put("/src/a/b", props("leaf"));
        src.put("/src/a/c", props("leaf"));
        src
    }

    #[test]
    fn test_copy_rollback_removes_partial_work() {
        let federation = federation();
        let src = seeded_source();
        let dst = Arc::new(FlakyProvider::new(Some(2)));
        dst.put("/dst");
        federation.register_mount(Mount::new("/src", src.capabilities(), src.clone()));
        federation.register_mount(Mount::new(
            "/dst",
            Capabilities::modifiable(),
            Arc::clone(&dst) as Arc<dyn ResourceProvider>,
        ));

        let session = federation.open_session(Identity::user("amy"));
        let err = session.copy("/src/a", "/dst").unwrap_err();
        assert!(matches!(err, FederationError::Persistence(_)));

        // the two creates that succeeded were rolled back
        assert!(!dst.contains("/dst/a"));
        assert!(!dst.contains("/dst/a/b"));
        assert_eq!(session.get_resource("/dst/a").unwrap(), None);
    }

    #[test]
    fn test_move_keeps_source_when_destination_fails() {
        let federation = federation();
        let src = seeded_source();
        let dst = Arc::new(FlakyProvider::new(Some(2)));
        dst.put("/dst");
        federation.register_mount(Mount::new("/src", src.capabilities(), src.clone()));
        federation.register_mount(Mount::new(
            "/dst",
            Capabilities::modifiable(),
            Arc::clone(&dst) as Arc<dyn ResourceProvider>,
        ));

        let session = federation.open_session(Identity::user("amy"));
        assert!(session.move_resource("/src/a", "/dst").is_err());

        let survivor = session.get_resource("/src/a").unwrap().unwrap();
        assert!(!survivor.synthetic);
        assert!(!dst.contains("/dst/a"));
    }

    #[test]
    fn test_move_fallback_across_providers() {
        let federation = federation();
        let src = seeded_source();
        let dst = Arc::new(MemoryProvider::new());
        dst.put("/dst", props("root"));
        federation.register_mount(Mount::new("/src", src.capabilities(), src.clone()));
        federation.register_mount(Mount::new("/dst", dst.capabilities(), dst.clone()));

        let session = federation.open_session(Identity::user("amy"));
        let moved = session.move_resource("/src/a", "/dst").unwrap();
        assert_eq!(moved.path, "/dst/a");

        assert_eq!(session.get_resource("/src/a").unwrap(), None);
        let leaf = session.get_resource("/dst/a/b").unwrap().unwrap();
        assert_eq!(leaf.resource_type(), Some("leaf"));
    }

    #[test]
    fn test_sub_mount_forces_generic_copy() {
        let federation = federation();
        let main = Arc::new(MemoryProvider::new());
        main.put("/a", props("root"));
        main.put("/a/src", props("node"));
        main.put("/a/src/kid", props("leaf"));
        main.put("/a/dst", props("node"));
        let sub = Arc::new(MemoryProvider::new());
        federation.register_mount(Mount::new("/a", main.capabilities(), main.clone()));
        federation.register_mount(Mount::new("/a/dst/sub", sub.capabilities(), sub));

        let session = federation.open_session(Identity::user("amy"));
        let copied = session.copy("/a/src", "/a/dst").unwrap();
        assert_eq!(copied.path, "/a/dst/src");
        assert!(session.get_resource("/a/dst/src/kid").unwrap().is_some());
        assert!(session.get_resource("/a/src").unwrap().is_some());
    }

    #[test]
    fn test_copy_fails_when_either_end_missing() {
        let federation = federation();
        let src = seeded_source();
        federation.register_mount(Mount::new("/src", src.capabilities(), src));

        let session = federation.open_session(Identity::user("amy"));
        // destination is not covered by any mount
        assert!(matches!(
            session.copy("/src/a", "/elsewhere"),
            Err(FederationError::Persistence(_))
        ));
        // source path resolves to nothing
        assert!(matches!(
            session.copy("/src/missing", "/src"),
            Err(FederationError::Persistence(_))
        ));
    }

    #[test]
    fn test_traversal_lookup_never_synthesizes() {
        let federation = federation();
        let deep = Arc::new(MemoryProvider::new());
        federation.register_mount(Mount::new("/a/b/c", deep.capabilities(), deep));

        let session = federation.open_session(Identity::user("amy"));
        assert!(session
            .lookup("/a/b", None, None, true)
            .unwrap()
            .is_none());
        let placeholder = session.lookup("/a/b", None, None, false).unwrap().unwrap();
        assert!(placeholder.synthetic);
    }

    #[test]
    fn test_create_auth_failure_on_sole_writable_mount_surfaces() {
        let federation = federation();
        let guarded = Arc::new(MemoryProvider::new().with_auth_policy(AuthPolicy::AdminOnly));
        federation.register_mount(Mount::new("/w", guarded.capabilities(), guarded));

        let session = federation.open_session(Identity::user("amy"));
        assert!(matches!(
            session.create("/w/x", Properties::new()),
            Err(FederationError::Authentication(_))
        ));
    }

    #[test]
    fn test_get_parent_falls_back_to_synthetic_intermediate() {
        let federation = federation();
        let deep = Arc::new(MemoryProvider::new());
        deep.put("/a/b/c", props("leaf"));
        federation.register_mount(Mount::new("/a/b/c", deep.capabilities(), deep));

        let session = federation.open_session(Identity::user("amy"));
        let child = session.get_resource("/a/b/c").unwrap().unwrap();
        let parent = session.get_parent(&child).unwrap().unwrap();
        assert_eq!(parent.path, "/a/b");
        assert!(parent.synthetic);

        // parent of a path outside any mount scaffolding
        let stray = Resource::synthetic("/z/zz");
        assert!(session.get_parent(&stray).unwrap().is_none());
    }

    #[test]
    fn test_super_type_via_privileged_session() {
        let federation = federation();
        let types = Arc::new(MemoryProvider::new().with_auth_policy(AuthPolicy::AdminOnly));
        let mut type_props = Properties::new();
        type_props.insert("superType".to_string(), "/types/base".into());
        types.put("/types/page", type_props);
        federation.register_mount(Mount::new("/types", types.capabilities(), types.clone()));

        // the unprivileged caller cannot read /types directly but the
        // structural lookup goes through the lazily opened admin session
        let session = federation.open_session(Identity::user("amy"));
        assert_eq!(session.get_resource("/types/page").unwrap(), None);
        assert_eq!(
            session.super_type_of("/types/page"),
            Some("/types/base".to_string())
        );

        let mut resource_props = Properties::new();
        resource_props.insert("type".to_string(), "/types/page".into());
        let resource = Resource::new("/content/x", resource_props);
        assert_eq!(
            session.parent_type_of(&resource),
            Some("/types/base".to_string())
        );

        // closing the caller session also releases the admin session
        session.close();
        assert_eq!(types.logout_count(), 1);
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let federation = federation();
        let session = federation.open_session(Identity::user("amy"));
        session.close();

        assert!(matches!(
            session.get_resource("/"),
            Err(FederationError::SessionClosed)
        ));
        assert!(matches!(
            session.create("/x", Properties::new()),
            Err(FederationError::SessionClosed)
        ));
        assert!(!session.is_live());
        assert!(session.super_type_of("/types/x").is_none());
    }
}
