//! Providers bundled with the engine.
//!
//! - `memory`: in-memory provider implementing every capability, used as the
//!   reference backend for embedders and tests.

pub mod memory;

pub use memory::{AuthPolicy, MemoryProvider, MemoryStats, LANG_SUBSTRING};
