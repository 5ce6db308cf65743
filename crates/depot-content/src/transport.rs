//! Transport seam
//!
//! The engine owns sequencing and policy; actual byte movement (upstream
//! fetches, cache reads and writes, deletion) happens behind
//! [`ContentTransport`]. Production backends wrap disk and HTTP; tests use
//! the in-memory transport from `depot-test-utils`.

use crate::error::TransportError;
use crate::location::ConcreteResource;
use async_trait::async_trait;
use depot_model::StoreKey;
use tokio::io::AsyncRead;

/// Uploaded content, handed through to the backend unread
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// What a transfer is being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOperation {
    /// Read content out
    Download,
    /// Write content in
    Upload,
    /// Enumerate directory entries
    Listing,
    /// Content generated on the fly (merged metadata and the like)
    Generate,
}

/// Handle to resolved, cached artifact content at a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transfer {
    /// Store the content resolved against
    pub key: StoreKey,
    /// Repository-relative path
    pub path: String,
}

impl Transfer {
    /// Create a transfer handle
    #[must_use]
    pub fn new(key: StoreKey, path: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
        }
    }
}

/// One entry of a directory listing, tagged with the store it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResource {
    /// Store contributing the entry
    pub key: StoreKey,
    /// Directory that was listed
    pub path: String,
    /// Entry name; directories carry a trailing `/`
    pub name: String,
}

/// Physical content backend
///
/// Implementations move bytes; they do not interpret groups (expansion
/// happens before the transport is involved) and they own per-transfer
/// timeouts and retry policy. All methods may block on I/O.
#[async_trait]
pub trait ContentTransport: Send + Sync {
    /// Whether content exists at the resource without materializing it
    async fn exists(&self, resource: &ConcreteResource) -> Result<bool, TransportError>;

    /// Resolve the resource to a transfer: for repository locations this may
    /// fetch from upstream and populate the cache; for cache-only locations
    /// it consults local storage only. `Ok(None)` means not found.
    async fn retrieve(&self, resource: &ConcreteResource)
        -> Result<Option<Transfer>, TransportError>;

    /// Write content at the resource, returning the resulting transfer
    async fn store(
        &self,
        resource: &ConcreteResource,
        content: ContentStream,
    ) -> Result<Transfer, TransportError>;

    /// Delete content at the resource; returns whether anything was removed
    async fn delete(&self, resource: &ConcreteResource) -> Result<bool, TransportError>;

    /// List the directory at the resource. Entry names are relative;
    /// directories carry a trailing `/`.
    async fn list_dir(&self, resource: &ConcreteResource) -> Result<Vec<String>, TransportError>;

    /// Read the full content behind a resolved transfer
    async fn open(&self, transfer: &Transfer) -> Result<Vec<u8>, TransportError>;

    /// Invalidate/refresh the cached view of one file without deleting
    /// backing content
    async fn refresh(&self, resource: &ConcreteResource) -> Result<(), TransportError>;

    /// Cache reference for the resource, whether or not content exists yet
    fn cache_reference(&self, resource: &ConcreteResource) -> Transfer {
        Transfer::new(resource.key().clone(), resource.path.clone())
    }
}
