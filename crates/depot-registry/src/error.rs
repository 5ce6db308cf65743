//! Registry errors

use depot_model::StoreKey;

/// Errors raised by registry mutations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Create-with-fail-if-exists collided with a live store
    #[error("store already exists: {key}")]
    AlreadyExists { key: StoreKey },

    /// The store is a readonly hosted repository; make it writable before
    /// deleting it
    #[error("store {key} is readonly; modify it to non-readonly before deleting")]
    ReadOnly { key: StoreKey },
}
