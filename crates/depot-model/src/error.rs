//! Model-level errors

/// Errors raised while validating repository definitions
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Key string does not match `packageType:storeType:name`
    #[error("invalid store key: {0}")]
    InvalidStoreKey(String),

    /// Store type segment is not one of hosted/remote/group
    #[error("unknown store type: {0}")]
    UnknownStoreType(String),

    /// Package type is not registered
    #[error("unknown package type: {0}")]
    UnknownPackageType(String),

    /// Store kind does not match the store type encoded in the key
    #[error("store kind mismatch for {key}: key says {expected}, payload is {actual}")]
    KindMismatch {
        key: String,
        expected: String,
        actual: String,
    },
}
