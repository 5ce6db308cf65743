//! Depot Repository Model
//!
//! Entity types for the depot artifact-repository manager:
//!
//! - [`StoreKey`]: composite `(packageType, storeType, name)` identity
//! - [`ArtifactStore`]: a hosted, remote, or group repository definition,
//!   with the variant payloads in the closed [`StoreKind`] sum type
//! - [`ArtifactPathInfo`]: release/snapshot classification of artifact paths
//!
//! The model validates shape only. Cross-store invariants (membership
//! resolution, write policy) live in `depot-registry` and `depot-content`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod key;
mod path_info;
mod store;

// Re-exports
pub use error::ModelError;
pub use key::{
    is_valid_package_type, package_types, StoreKey, StoreType, DEFAULT_PACKAGE_TYPE,
};
pub use path_info::ArtifactPathInfo;
pub use store::{
    ArtifactStore, GroupConfig, HostedConfig, PathStyle, RemoteConfig, StoreKind,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
