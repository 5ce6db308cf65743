//! Content resolution errors
//!
//! Absence of content in a multi-store scan is not an error (the scan simply
//! moves to the next store); these types cover policy violations, broken
//! references, and backend failures.

use depot_model::StoreKey;

/// A backend I/O failure, tagged with the store and path it hit
#[derive(Debug, thiserror::Error)]
#[error("transport failure in {key} at {path}: {reason}")]
pub struct TransportError {
    /// Store whose backend failed
    pub key: StoreKey,
    /// Path being accessed
    pub path: String,
    /// Backend-provided description
    pub reason: String,
}

impl TransportError {
    /// Create a transport error
    #[must_use]
    pub fn new(key: StoreKey, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by location expansion and content resolution
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// A referenced key could not be resolved to a live store when one was
    /// required (cache-only reference, digest lookup)
    #[error("no store found for: {key}")]
    MissingStore { key: StoreKey },

    /// Write refused: the hosted target is readonly
    #[error("store {key} is readonly")]
    ReadOnly { key: StoreKey },

    /// Write refused by store policy
    #[error("write to {key} not allowed for {path}: {reason}")]
    WriteNotAllowed {
        key: StoreKey,
        path: String,
        reason: String,
    },

    /// A multi-store operation found no store suitable for the request
    #[error("no suitable store available for {path}")]
    NoSuitableStore { path: String },

    /// Content required to be resolvable was not found anywhere
    #[error("content not found in {key}: {path}")]
    NotFound { key: StoreKey, path: String },

    /// Backend failure on a designated target
    #[error(transparent)]
    Transport(#[from] TransportError),
}
