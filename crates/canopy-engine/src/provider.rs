//! The contract required from backend providers.
//!
//! A registered provider is a factory: it authenticates a caller identity and
//! hands back a [`ProviderSession`], the per-session authenticated handle the
//! engine actually operates on. Providers receive absolute paths in the
//! federated namespace; the engine never rebases paths to the mount point.
//!
//! All optional operations have default implementations so that a provider
//! only implements what its mount's capability flags advertise. The engine
//! checks capabilities before dispatch, so the defaults are a safety net,
//! not a routing mechanism.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use canopy_types::{
    AuthenticationError, Identity, PersistenceError, Properties, QueryRow, Resource,
};

/// Extra lookup parameters passed through to the provider untouched.
pub type Params = HashMap<String, String>;

/// A registered backend provider, stateless with respect to sessions.
pub trait ResourceProvider: Send + Sync {
    /// Authenticate `identity` and return a handle bound to it.
    ///
    /// Called at most once per (mount, session) pair; the engine caches both
    /// success and failure for the lifetime of the session.
    fn authenticate(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn ProviderSession>, AuthenticationError>;
}

/// An authenticated handle: one provider bound to one identity for one
/// session.
///
/// Methods take `&self`; interior mutability is the provider's concern.
/// Returned iterators own their data (providers typically capture an `Arc`
/// of their state or collect up front).
pub trait ProviderSession: Send + Sync {
    /// Return the resource at `path`, or `None` if this provider has none.
    ///
    /// `traversal` is true when the lookup is a structural step of a larger
    /// walk (finding an ancestor) rather than a caller-facing resolution;
    /// providers may use it to skip expensive resolution work.
    fn get_resource(
        &self,
        path: &str,
        parent_hint: Option<&Resource>,
        params: Option<&Params>,
        traversal: bool,
    ) -> Option<Resource>;

    /// Return the parent of `child`, or `None`.
    fn get_parent(&self, child: &Resource) -> Option<Resource> {
        let parent = canopy_types::path::parent(&child.path)?;
        self.get_resource(parent, None, None, true)
    }

    /// List the children this provider reports under `parent`.
    fn list_children(&self, parent: &Resource) -> Box<dyn Iterator<Item = Resource>>;

    /// True while the backing store is usable.
    fn is_live(&self) -> bool {
        true
    }

    /// Discard any stale internal state.
    fn refresh(&self) {}

    /// Release the handle. Called exactly once, when the session closes.
    fn logout(&self) {}

    // Modifiable providers

    /// Create a resource at `path`.
    fn create(&self, path: &str, properties: Properties) -> Result<Resource, PersistenceError> {
        let _ = properties;
        Err(PersistenceError::new(path, "provider does not support create"))
    }

    /// Delete the resource at `path`.
    fn delete(&self, path: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::new(path, "provider does not support delete"))
    }

    /// Copy the subtree at `src` under `dst` natively.
    ///
    /// `Ok(false)` means the provider declines and the engine should fall
    /// back to its generic subtree copy.
    fn copy(&self, src: &str, dst: &str) -> Result<bool, PersistenceError> {
        let _ = (src, dst);
        Ok(false)
    }

    /// Move the subtree at `src` under `dst` natively. See [`Self::copy`].
    fn move_to(&self, src: &str, dst: &str) -> Result<bool, PersistenceError> {
        let _ = (src, dst);
        Ok(false)
    }

    /// Persist pending changes.
    fn commit(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Discard pending changes.
    fn revert(&self) {}

    /// True if there are pending, uncommitted changes.
    fn has_changes(&self) -> bool {
        false
    }

    // Attributable providers

    /// Names of the attributes this provider exposes.
    fn attribute_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// The value of the named attribute, or `None`.
    fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        let _ = name;
        None
    }

    // Queryable providers

    /// Query languages this provider understands.
    fn supported_languages(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run `query` in `language`, yielding matching resources.
    fn find_resources(&self, query: &str, language: &str) -> Box<dyn Iterator<Item = Resource>> {
        let _ = (query, language);
        Box::new(std::iter::empty())
    }

    /// Run `query` in `language`, yielding structured rows.
    fn query_resources(&self, query: &str, language: &str) -> Box<dyn Iterator<Item = QueryRow>> {
        let _ = (query, language);
        Box::new(std::iter::empty())
    }

    // Adaptable providers

    /// Adapt this handle to a provider-defined type.
    ///
    /// The returned box must downcast to the type behind `type_id`; the
    /// engine exposes this generically as `Session::adapt_to::<T>()`.
    fn adapt_to(&self, type_id: TypeId) -> Option<Box<dyn Any>> {
        let _ = type_id;
        None
    }
}
