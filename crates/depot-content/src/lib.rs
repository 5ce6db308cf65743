//! Depot Content Resolution
//!
//! Location expansion and the content resolution engine:
//!
//! - [`Location`] / [`LocationExpander`]: turn abstract references (including
//!   virtual group references) into concrete, ordered, resolvable locations
//! - [`ContentEngine`]: retrieve / store / delete / list / rescan / digest
//!   across one or many repositories, with first-match precedence and
//!   write-eligibility enforcement
//! - [`ContentTransport`]: the seam behind which all physical byte movement
//!   happens
//!
//! # Example
//!
//! ```rust,ignore
//! use depot_content::{ContentEngine, TransferOperation};
//!
//! # async fn example(engine: ContentEngine, group: depot_model::ArtifactStore) {
//! let transfer = engine
//!     .retrieve_first(&[group], "org/example/app/1.0/app-1.0.jar")
//!     .await
//!     .unwrap();
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod config;
mod digest;
mod engine;
mod error;
mod expander;
mod location;
mod transport;

// Re-exports
pub use config::DepotConfig;
pub use digest::DigestAlgorithm;
pub use engine::ContentEngine;
pub use error::{ContentError, TransportError};
pub use expander::LocationExpander;
pub use location::{
    CacheOnlyLocation, ConcreteResource, GroupLocation, Location, RepositoryLocation, Resource,
    VirtualResource,
};
pub use transport::{
    ContentStream, ContentTransport, StoreResource, Transfer, TransferOperation,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
