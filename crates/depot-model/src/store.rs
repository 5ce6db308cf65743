//! Repository definitions
//!
//! Provides [`ArtifactStore`], the polymorphic definition of a hosted, remote,
//! or group repository. The variant payloads live in a closed [`StoreKind`]
//! sum type so that resolution logic can match on kind exhaustively.
//!
//! # JSON shape
//!
//! A store serializes as one flat object: common fields plus variant fields,
//! discriminated by a `"type"` field matching the store type and a `"key"`
//! field carrying the canonical key string. Unknown fields are ignored on
//! input (the surrounding system patches legacy JSON before handing it over).
//! `transient_metadata` is process-local and never serialized.

use crate::error::ModelError;
use crate::key::{StoreKey, StoreType};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// How artifact paths map onto backing storage
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Store content under the request path verbatim
    #[default]
    Plain,
    /// Fan content out under a digest of the directory path
    Hashed,
}

impl PathStyle {
    /// Translate a request path into a storage path.
    ///
    /// `Plain` returns the path unchanged. `Hashed` fans the directory
    /// portion out under a two-level hex prefix of its SHA-256 digest,
    /// keeping the file name for operator readability.
    #[must_use]
    pub fn storage_path(&self, path: &str) -> String {
        match self {
            Self::Plain => path.to_string(),
            Self::Hashed => {
                let trimmed = path.trim_matches('/');
                let (dir, file) = match trimmed.rfind('/') {
                    Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
                    None => ("", trimmed),
                };
                let digest = hex::encode(Sha256::digest(dir.as_bytes()));
                format!("{}/{}/{}/{}", &digest[..2], &digest[2..4], digest, file)
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Variant payload for hosted repositories
///
/// Hosted stores are the only legal write targets in the system.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HostedConfig {
    /// Accept release artifacts
    #[serde(default = "default_true")]
    pub allow_releases: bool,

    /// Accept snapshot artifacts
    #[serde(default)]
    pub allow_snapshots: bool,

    /// Reject all writes, including deletion of the store itself
    #[serde(default)]
    pub readonly: bool,

    /// Alternative storage root for this store's content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_override: Option<PathBuf>,

    /// Seconds before cached snapshot metadata is considered stale (0 = system default)
    #[serde(default)]
    pub snapshot_timeout_seconds: u32,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            allow_releases: true,
            allow_snapshots: false,
            readonly: false,
            storage_override: None,
            snapshot_timeout_seconds: 0,
        }
    }
}

/// Variant payload for remote (proxy) repositories
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RemoteConfig {
    /// Upstream base URL
    pub url: String,

    /// Upstream credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Egress proxy settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_host: Option<String>,
    #[serde(default)]
    pub proxy_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_password: Option<String>,

    /// Client TLS material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_certificate_pem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_certificate_pem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_trust_policy: Option<String>,

    /// Per-request timeout (0 = system default)
    #[serde(default)]
    pub timeout_seconds: u32,

    /// Seconds cached content stays valid (0 = system default)
    #[serde(default)]
    pub cache_timeout_seconds: u32,

    /// Seconds cached metadata stays valid (0 = system default)
    #[serde(default)]
    pub metadata_timeout_seconds: u32,

    /// Seconds a not-found result stays cached (0 = system default)
    #[serde(default)]
    pub nfc_timeout_seconds: u32,

    /// Bypass the local cache entirely
    #[serde(default)]
    pub passthrough: bool,

    /// Prefetch priority; higher values prefetch earlier (0 disables)
    #[serde(default)]
    pub prefetch_priority: i32,

    /// Re-prefetch on rescan
    #[serde(default)]
    pub prefetch_rescan: bool,
}

impl RemoteConfig {
    /// Create a config pointing at `url`, with everything else defaulted.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Host portion of the upstream URL, if the URL has one.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.authority().map(|(host, _)| host)
    }

    /// Port of the upstream URL; falls back on the scheme default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.authority().map_or(0, |(_, port)| port)
    }

    fn authority(&self) -> Option<(String, u16)> {
        let rest = self.url.split_once("://").map(|(_, r)| r)?;
        let authority = rest.split('/').next()?;
        // Drop userinfo if the URL embeds credentials.
        let authority = authority.rsplit('@').next()?;
        if authority.is_empty() {
            return None;
        }
        let default_port = if self.url.starts_with("https") { 443 } else { 80 };
        match authority.split_once(':') {
            Some((host, port)) => {
                let port = port.parse().unwrap_or(default_port);
                Some((host.to_string(), port))
            }
            None => Some((authority.to_string(), default_port)),
        }
    }
}

/// Variant payload for group (virtual aggregate) repositories
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GroupConfig {
    /// Ordered membership; may reference other groups, missing stores, or
    /// even (transitively) this group itself. The resolver tolerates all of
    /// that; the list itself only guarantees uniqueness.
    #[serde(default, deserialize_with = "deserialize_constituents")]
    pub constituents: Vec<StoreKey>,

    /// Insert implied additions at the front instead of the back
    #[serde(default)]
    pub prepend_constituent: bool,
}

impl GroupConfig {
    /// Create a config with normalized membership (duplicates dropped,
    /// first occurrence wins).
    #[must_use]
    pub fn new(constituents: Vec<StoreKey>) -> Self {
        Self {
            constituents: normalize_constituents(constituents),
            prepend_constituent: false,
        }
    }

    /// Add a member, honoring the prepend policy.
    ///
    /// Returns false (without modifying the list) if the key is already a
    /// member.
    pub fn add_constituent(&mut self, key: StoreKey) -> bool {
        if self.constituents.contains(&key) {
            return false;
        }
        if self.prepend_constituent {
            self.constituents.insert(0, key);
        } else {
            self.constituents.push(key);
        }
        true
    }

    /// Remove a member; returns whether it was present.
    pub fn remove_constituent(&mut self, key: &StoreKey) -> bool {
        let before = self.constituents.len();
        self.constituents.retain(|k| k != key);
        self.constituents.len() != before
    }
}

fn normalize_constituents(raw: impl IntoIterator<Item = StoreKey>) -> Vec<StoreKey> {
    let mut seen = BTreeSet::new();
    raw.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

// Legacy payloads may carry explicit nulls inside the membership list; they
// are dropped along with duplicate entries.
fn deserialize_constituents<'de, D>(deserializer: D) -> Result<Vec<StoreKey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<Option<StoreKey>> = serde::Deserialize::deserialize(deserializer)?;
    Ok(normalize_constituents(raw.into_iter().flatten()))
}

/// Variant payloads, discriminated by store type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreKind {
    /// Writable local repository
    Hosted(HostedConfig),
    /// Cached proxy of an upstream repository
    Remote(RemoteConfig),
    /// Virtual aggregate of other stores
    Group(GroupConfig),
}

impl StoreKind {
    /// The store type this payload corresponds to
    #[inline]
    #[must_use]
    pub fn store_type(&self) -> StoreType {
        match self {
            Self::Hosted(_) => StoreType::Hosted,
            Self::Remote(_) => StoreType::Remote,
            Self::Group(_) => StoreType::Group,
        }
    }
}

/// A configured repository definition
///
/// # Invariants
/// - `key().store_type()` always matches the kind payload; constructors and
///   [`validate`](Self::validate) enforce this.
/// - `transient_metadata` is process-local and never serialized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArtifactStore {
    key: StoreKey,

    /// Operator-facing description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// User-visible metadata, persisted with the store
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Process-local scratch state; never persisted or serialized
    #[serde(skip)]
    pub transient_metadata: HashMap<String, String>,

    /// Excluded from enabled-only resolution views while set
    #[serde(default)]
    pub disabled: bool,

    /// Seconds until an auto-disabled store re-enables (0 = system default)
    #[serde(default)]
    pub disable_timeout_seconds: u32,

    /// Storage path mapping
    #[serde(default)]
    pub path_style: PathStyle,

    /// Path patterns this store will serve (empty = everything)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub path_mask_patterns: BTreeSet<String>,

    /// Trust this store's index over upstream listings
    #[serde(default)]
    pub authoritative_index: bool,

    /// A rescan of this store's content is underway (observability only)
    #[serde(default, skip_serializing_if = "is_false")]
    pub rescan_in_progress: bool,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub create_time: DateTime<Utc>,

    #[serde(flatten)]
    kind: StoreKind,
}

impl ArtifactStore {
    /// Create a store, checking that the kind payload matches the key's type.
    ///
    /// # Errors
    /// Returns [`ModelError::KindMismatch`] when the key says one store type
    /// and the payload is another.
    pub fn new(key: StoreKey, kind: StoreKind) -> Result<Self, ModelError> {
        if key.store_type() != kind.store_type() {
            return Err(ModelError::KindMismatch {
                key: key.to_string(),
                expected: key.store_type().to_string(),
                actual: kind.store_type().to_string(),
            });
        }
        Ok(Self::with_kind(key, kind))
    }

    /// Create a hosted store with default policy (releases allowed,
    /// snapshots rejected, writable).
    #[must_use]
    pub fn hosted(package_type: &str, name: &str) -> Self {
        let key = StoreKey::new(package_type, StoreType::Hosted, name);
        Self::with_kind(key, StoreKind::Hosted(HostedConfig::default()))
    }

    /// Create a remote store proxying `url`.
    #[must_use]
    pub fn remote(package_type: &str, name: &str, url: &str) -> Self {
        let key = StoreKey::new(package_type, StoreType::Remote, name);
        Self::with_kind(key, StoreKind::Remote(RemoteConfig::new(url)))
    }

    /// Create a group with the given (normalized) membership.
    #[must_use]
    pub fn group(package_type: &str, name: &str, constituents: Vec<StoreKey>) -> Self {
        let key = StoreKey::new(package_type, StoreType::Group, name);
        Self::with_kind(key, StoreKind::Group(GroupConfig::new(constituents)))
    }

    // Key and kind are known to agree at every call site.
    fn with_kind(key: StoreKey, kind: StoreKind) -> Self {
        Self {
            key,
            description: None,
            metadata: BTreeMap::new(),
            transient_metadata: HashMap::new(),
            disabled: false,
            disable_timeout_seconds: 0,
            path_style: PathStyle::Plain,
            path_mask_patterns: BTreeSet::new(),
            authoritative_index: false,
            rescan_in_progress: false,
            create_time: Utc::now(),
            kind,
        }
    }

    /// The store's identity
    #[inline]
    #[must_use]
    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Store type, from the key
    #[inline]
    #[must_use]
    pub fn store_type(&self) -> StoreType {
        self.key.store_type()
    }

    /// Package type, from the key
    #[inline]
    #[must_use]
    pub fn package_type(&self) -> &str {
        self.key.package_type()
    }

    /// Name, from the key
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.name()
    }

    /// Variant payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &StoreKind {
        &self.kind
    }

    /// True when this store is hosted or remote
    #[inline]
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.key.store_type().is_concrete()
    }

    /// Hosted payload, if this is a hosted store
    #[inline]
    #[must_use]
    pub fn as_hosted(&self) -> Option<&HostedConfig> {
        match &self.kind {
            StoreKind::Hosted(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Mutable hosted payload, if this is a hosted store
    #[inline]
    pub fn as_hosted_mut(&mut self) -> Option<&mut HostedConfig> {
        match &mut self.kind {
            StoreKind::Hosted(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Remote payload, if this is a remote store
    #[inline]
    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteConfig> {
        match &self.kind {
            StoreKind::Remote(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Mutable remote payload, if this is a remote store
    #[inline]
    pub fn as_remote_mut(&mut self) -> Option<&mut RemoteConfig> {
        match &mut self.kind {
            StoreKind::Remote(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Group payload, if this is a group
    #[inline]
    #[must_use]
    pub fn as_group(&self) -> Option<&GroupConfig> {
        match &self.kind {
            StoreKind::Group(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// Mutable group payload, if this is a group
    #[inline]
    pub fn as_group_mut(&mut self) -> Option<&mut GroupConfig> {
        match &mut self.kind {
            StoreKind::Group(cfg) => Some(cfg),
            _ => None,
        }
    }

    /// True for a hosted store whose `readonly` flag is set
    #[inline]
    #[must_use]
    pub fn is_readonly_hosted(&self) -> bool {
        self.as_hosted().is_some_and(|h| h.readonly)
    }

    /// Re-check the key/kind invariant.
    ///
    /// Deserialization cannot enforce the invariant structurally (the key and
    /// the `"type"` discriminant arrive as independent fields), so boundary
    /// code validates after decoding.
    ///
    /// # Errors
    /// Returns [`ModelError::KindMismatch`] on disagreement.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.key.store_type() != self.kind.store_type() {
            return Err(ModelError::KindMismatch {
                key: self.key.to_string(),
                expected: self.key.store_type().to_string(),
                actual: self.kind.store_type().to_string(),
            });
        }
        Ok(())
    }

    /// Set the description (builder style)
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the disabled flag (builder style)
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}
