//! Store identity
//!
//! Provides [`StoreKey`], the composite `(packageType, storeType, name)`
//! identity of a repository definition, and [`StoreType`], the closed set of
//! repository kinds.

use crate::error::ModelError;
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Package type used when a key string omits one (legacy two-part form).
pub const DEFAULT_PACKAGE_TYPE: &str = "maven";

/// Package types the system recognizes.
///
/// Keys referencing any other package type fail to parse. The set is fixed at
/// compile time; the surrounding system registers no types dynamically.
static PACKAGE_TYPES: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| ["maven", "npm", "generic-http"].into_iter().collect());

/// Check whether `package_type` is a recognized package type.
#[inline]
#[must_use]
pub fn is_valid_package_type(package_type: &str) -> bool {
    PACKAGE_TYPES.contains(package_type)
}

/// All recognized package types, in sorted order.
#[must_use]
pub fn package_types() -> Vec<&'static str> {
    PACKAGE_TYPES.iter().copied().collect()
}

/// The kind of a repository definition
///
/// `Hosted` and `Remote` are concrete (they can back content directly);
/// `Group` is a virtual aggregate of other stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Writable, locally-stored repository
    Hosted,
    /// Cached proxy of an upstream network repository
    Remote,
    /// Named, ordered aggregate of other stores
    Group,
}

impl StoreType {
    /// True for hosted and remote stores (i.e., not a group)
    #[inline]
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::Group)
    }

    /// Canonical lowercase name, as used in key strings and JSON
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Remote => "remote",
            Self::Group => "group",
        }
    }
}

impl Display for StoreType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hosted" => Ok(Self::Hosted),
            "remote" => Ok(Self::Remote),
            "group" => Ok(Self::Group),
            other => Err(ModelError::UnknownStoreType(other.to_string())),
        }
    }
}

/// Composite identity of an [`ArtifactStore`](crate::ArtifactStore)
///
/// Immutable and totally ordered (package type, then store type, then name)
/// so that key sets serialize deterministically. Round-trips exactly through
/// the canonical string form `packageType:storeType:name`, which appears in
/// URLs, JSON bodies, and log messages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    package_type: String,
    store_type: StoreType,
    name: String,
}

impl StoreKey {
    /// Create a new key
    ///
    /// The constructor does not validate the package type; validation happens
    /// when parsing external input via [`FromStr`].
    #[inline]
    #[must_use]
    pub fn new(
        package_type: impl Into<String>,
        store_type: StoreType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            package_type: package_type.into(),
            store_type,
            name: name.into(),
        }
    }

    /// Package type segment (e.g. `maven`)
    #[inline]
    #[must_use]
    pub fn package_type(&self) -> &str {
        &self.package_type
    }

    /// Store type segment
    #[inline]
    #[must_use]
    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    /// Name segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package_type, self.store_type, self.name)
    }
}

impl FromStr for StoreKey {
    type Err = ModelError;

    /// Parse the canonical `packageType:storeType:name` form.
    ///
    /// The legacy two-part `storeType:name` form (from the original wire
    /// format) is accepted with the package type defaulted to
    /// [`DEFAULT_PACKAGE_TYPE`]; formatting always emits the three-part form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (package_type, store_type, name) = match parts.as_slice() {
            [package_type, store_type, name] => (*package_type, *store_type, *name),
            [store_type, name] => (DEFAULT_PACKAGE_TYPE, *store_type, *name),
            _ => return Err(ModelError::InvalidStoreKey(s.to_string())),
        };

        if name.is_empty() {
            return Err(ModelError::InvalidStoreKey(s.to_string()));
        }
        if !is_valid_package_type(package_type) {
            return Err(ModelError::UnknownPackageType(package_type.to_string()));
        }

        Ok(Self::new(package_type, store_type.parse::<StoreType>()?, name))
    }
}

// Keys serialize as their canonical string form; they appear inside URLs and
// JSON bodies, so the string is the compatibility surface.
impl serde::Serialize for StoreKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for StoreKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
