//! Pure data types for canopy: resources, logical paths, identities, errors.
//!
//! This crate is a leaf dependency with no I/O and no engine logic. It exists
//! so that backend providers can implement the canopy contract without
//! pulling in the engine itself.

pub mod capability;
pub mod error;
pub mod identity;
pub mod path;
pub mod resource;

// Flat re-exports for convenience
pub use capability::*;
pub use error::*;
pub use identity::*;
pub use resource::*;
