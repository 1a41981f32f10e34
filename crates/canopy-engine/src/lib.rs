//! canopy-engine: the resource federation and resolution engine.
//!
//! This crate provides:
//!
//! - **Registry**: mount registration and the per-generation storage snapshot
//! - **Tree**: path trie with O(depth) longest-prefix mount routing
//! - **Auth**: per-session provider authentication, exactly-once lifecycle
//! - **Session**: the unified read/write/query/adapt view over all mounts,
//!   with synthetic placeholders keeping unowned intermediate paths walkable
//! - **Iter**: lazy chain/dedup combinators for merged provider results
//! - **Providers**: the bundled in-memory reference provider
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Federation                         │
//! │  ┌──────────────┐   ┌─────────────────────────────────┐  │
//! │  │  MountTable  │──▶│ ProviderStorage (snapshot):     │  │
//! │  │ (register/   │   │  PathTree + capability lists    │  │
//! │  │  unregister) │   └─────────────────────────────────┘  │
//! └──┴──────────────┴──────────────────┬─────────────────────┘
//!                                      │ open_session(identity)
//!                          ┌───────────▼───────────┐
//!                          │        Session        │
//!                          │  Authenticator (lazy, │
//!                          │  cached handles)      │
//!                          └───────────┬───────────┘
//!                                      │ delegate / synthesize
//!                          ┌───────────▼───────────┐
//!                          │  dyn ProviderSession  │
//!                          └───────────────────────┘
//! ```

pub mod auth;
pub mod iter;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod session;
pub mod tree;

pub use provider::{Params, ProviderSession, ResourceProvider};
pub use registry::{Federation, Mount, MountEntry, MountId, ProviderStorage};
pub use session::Session;

// Re-export the data types providers and embedders work with.
pub use canopy_types::{
    AuthenticationError, Capabilities, FederationError, FederationResult, Identity,
    PersistenceError, Properties, QueryRow, Resource,
};
