//! Depot Store Registry
//!
//! CRUD over repository definitions, keyed by `StoreKey`, with synchronous
//! change-event dispatch and snapshot-based membership resolution:
//!
//! - [`StoreRegistry`]: shared concurrent registry, the single source of
//!   truth other components query
//! - [`StoreQuery`]: pure membership/reverse-lookup algorithms over a copied
//!   registry snapshot
//! - [`StoreEventDispatcher`]: injected observer seam ([`NoOpDispatcher`] for
//!   embedding, [`MulticastDispatcher`] for servers)
//!
//! The registry enforces key uniqueness and nothing else; see the model crate
//! for what is deliberately tolerated (dangling references, cycles).

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod event;
mod query;
mod registry;

// Re-exports
pub use error::RegistryError;
pub use event::{
    MulticastDispatcher, NoOpDispatcher, StoreEvent, StoreEventDispatcher, StoreEventType,
};
pub use query::StoreQuery;
pub use registry::StoreRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
