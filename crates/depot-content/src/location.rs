//! Resolvable locations
//!
//! A [`Location`] is what the transport backend actually talks to: a virtual
//! group reference awaiting expansion, a cache-only reference to local
//! storage, or a fully-materialized remote repository location carrying its
//! network, auth, and TLS attributes. [`ConcreteResource`] pairs a location
//! with a path; [`VirtualResource`] is the ordered list the engine iterates.

use depot_model::{ArtifactStore, StoreKey, StoreKind};
use std::path::PathBuf;

/// Virtual reference to a group, expanded before any transport work
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLocation {
    /// Key of the group (store type is always group)
    pub key: StoreKey,
}

/// Reference to content in local cache storage
///
/// Hosted stores resolve here natively. A cache-only reference to a remote
/// store is a placeholder (used for cache eviction and bookkeeping) that the
/// expander materializes into a full [`RepositoryLocation`] when network
/// access is intended.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOnlyLocation {
    /// Key of the referenced store
    pub key: StoreKey,
    /// True when the referenced store is hosted (authoritative local content)
    pub hosted: bool,
    /// Snapshot artifacts accepted
    pub allow_snapshots: bool,
    /// Release artifacts accepted
    pub allow_releases: bool,
    /// Writes rejected
    pub readonly: bool,
    /// Alternative storage root
    pub storage_override: Option<PathBuf>,
}

impl CacheOnlyLocation {
    /// Cache-only placeholder for an arbitrary store key (e.g. a remote's
    /// local cache, for eviction purposes)
    #[must_use]
    pub fn for_key(key: StoreKey) -> Self {
        Self {
            key,
            hosted: false,
            allow_snapshots: false,
            allow_releases: false,
            readonly: false,
            storage_override: None,
        }
    }
}

/// Fully-materialized remote repository location
///
/// Carries every attribute the transport needs to reach the upstream:
/// credentials, proxy settings, TLS material, and timeouts (zero values
/// already replaced by system defaults during expansion).
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryLocation {
    /// Key of the remote store
    pub key: StoreKey,
    /// Upstream base URL
    pub uri: String,
    /// Upstream credentials
    pub user: Option<String>,
    pub password: Option<String>,
    /// Egress proxy
    pub proxy_host: Option<String>,
    pub proxy_port: u16,
    pub proxy_user: Option<String>,
    pub proxy_password: Option<String>,
    /// Client TLS material
    pub key_password: Option<String>,
    pub key_certificate_pem: Option<String>,
    pub server_certificate_pem: Option<String>,
    pub server_trust_policy: Option<String>,
    /// Timeouts, in seconds
    pub timeout_seconds: u32,
    pub cache_timeout_seconds: u32,
    pub metadata_timeout_seconds: u32,
    pub nfc_timeout_seconds: u32,
    /// Bypass the local cache
    pub passthrough: bool,
}

/// A place content can be resolved against
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Virtual group reference
    Group(GroupLocation),
    /// Local cache reference
    CacheOnly(CacheOnlyLocation),
    /// Networked remote repository
    Repository(RepositoryLocation),
}

impl Location {
    /// Canonical location for a store definition.
    ///
    /// Hosted stores map to cache-only locations carrying their write policy;
    /// remotes map to repository locations carrying network and auth
    /// attributes; groups map to virtual group locations.
    #[must_use]
    pub fn for_store(store: &ArtifactStore) -> Self {
        match store.kind() {
            StoreKind::Hosted(hosted) => Self::CacheOnly(CacheOnlyLocation {
                key: store.key().clone(),
                hosted: true,
                allow_snapshots: hosted.allow_snapshots,
                allow_releases: hosted.allow_releases,
                readonly: hosted.readonly,
                storage_override: hosted.storage_override.clone(),
            }),
            StoreKind::Remote(remote) => Self::Repository(RepositoryLocation {
                key: store.key().clone(),
                uri: remote.url.clone(),
                user: remote.user.clone(),
                password: remote.password.clone(),
                proxy_host: remote.proxy_host.clone(),
                proxy_port: remote.proxy_port,
                proxy_user: remote.proxy_user.clone(),
                proxy_password: remote.proxy_password.clone(),
                key_password: remote.key_password.clone(),
                key_certificate_pem: remote.key_certificate_pem.clone(),
                server_certificate_pem: remote.server_certificate_pem.clone(),
                server_trust_policy: remote.server_trust_policy.clone(),
                timeout_seconds: remote.timeout_seconds,
                cache_timeout_seconds: remote.cache_timeout_seconds,
                metadata_timeout_seconds: remote.metadata_timeout_seconds,
                nfc_timeout_seconds: remote.nfc_timeout_seconds,
                passthrough: remote.passthrough,
            }),
            StoreKind::Group(_) => Self::Group(GroupLocation {
                key: store.key().clone(),
            }),
        }
    }

    /// Key of the store this location references
    #[inline]
    #[must_use]
    pub fn key(&self) -> &StoreKey {
        match self {
            Self::Group(l) => &l.key,
            Self::CacheOnly(l) => &l.key,
            Self::Repository(l) => &l.key,
        }
    }

    /// Identifier the transport logs and caches under
    #[must_use]
    pub fn uri(&self) -> String {
        match self {
            Self::Repository(l) => l.uri.clone(),
            Self::Group(l) => format!("depot:{}", l.key),
            Self::CacheOnly(l) => format!("depot:{}", l.key),
        }
    }

    /// True when content can be written here
    #[inline]
    #[must_use]
    pub fn allows_storage(&self) -> bool {
        matches!(self, Self::CacheOnly(l) if l.hosted && !l.readonly)
    }

    /// True for virtual group locations
    #[inline]
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// One location plus one path: a unit of transport work
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteResource {
    /// Where to resolve (never a group after expansion)
    pub location: Location,
    /// Repository-relative path
    pub path: String,
}

impl ConcreteResource {
    /// Pair a location with a path
    #[must_use]
    pub fn new(location: Location, path: impl Into<String>) -> Self {
        Self {
            location,
            path: path.into(),
        }
    }

    /// Key of the backing store
    #[inline]
    #[must_use]
    pub fn key(&self) -> &StoreKey {
        self.location.key()
    }

    /// Resource for a child entry under this one
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let base = self.path.trim_end_matches('/');
        let path = if base.is_empty() {
            name.to_string()
        } else {
            format!("{base}/{name}")
        };
        Self::new(self.location.clone(), path)
    }
}

/// Ordered list of concrete resources produced by expansion
///
/// Downstream code iterates in order; position encodes precedence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualResource {
    resources: Vec<ConcreteResource>,
}

impl VirtualResource {
    /// Build from pre-paired resources
    #[must_use]
    pub fn from_resources(resources: Vec<ConcreteResource>) -> Self {
        Self { resources }
    }

    /// Pair each location with the same path, in order
    #[must_use]
    pub fn new(locations: Vec<Location>, path: &str) -> Self {
        Self {
            resources: locations
                .into_iter()
                .map(|location| ConcreteResource::new(location, path))
                .collect(),
        }
    }

    /// The ordered resources
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[ConcreteResource] {
        &self.resources
    }

    /// True when expansion produced nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl IntoIterator for VirtualResource {
    type Item = ConcreteResource;
    type IntoIter = std::vec::IntoIter<ConcreteResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

/// A path-bearing reference handed to the expander
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Single location plus path
    Concrete(ConcreteResource),
    /// Already-ordered list of location/path pairs
    Virtual(VirtualResource),
}
