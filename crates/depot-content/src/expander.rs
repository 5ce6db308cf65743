//! Location expansion
//!
//! Turns abstract, possibly-virtual references into the concrete, ordered
//! location list the engine iterates. Group references flatten through the
//! resolver; cache-only references to remote stores materialize into full
//! network-attribute-bearing repository locations; everything else passes
//! through unchanged.

use crate::config::DepotConfig;
use crate::error::ContentError;
use crate::location::{ConcreteResource, Location, Resource, VirtualResource};
use depot_model::ArtifactStore;
use depot_registry::StoreRegistry;
use std::sync::Arc;

/// Expands virtual and placeholder locations against the registry
#[derive(Debug, Clone)]
pub struct LocationExpander {
    registry: Arc<StoreRegistry>,
    config: DepotConfig,
}

impl LocationExpander {
    /// Create an expander with default config
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self::with_config(registry, DepotConfig::default())
    }

    /// Create an expander with explicit config
    #[must_use]
    pub fn with_config(registry: Arc<StoreRegistry>, config: DepotConfig) -> Self {
        Self { registry, config }
    }

    /// Canonical location for a store, with zero-valued remote timeouts
    /// replaced by the configured system defaults.
    #[must_use]
    pub fn location_for(&self, store: &ArtifactStore) -> Location {
        let mut location = Location::for_store(store);
        if let Location::Repository(repo) = &mut location {
            if repo.timeout_seconds == 0 {
                repo.timeout_seconds = self.config.request_timeout_seconds;
            }
            if repo.cache_timeout_seconds == 0 {
                repo.cache_timeout_seconds = self.config.cache_timeout_seconds;
            }
            if repo.metadata_timeout_seconds == 0 {
                repo.metadata_timeout_seconds = self.config.metadata_timeout_seconds;
            }
            if repo.nfc_timeout_seconds == 0 {
                repo.nfc_timeout_seconds = self.config.nfc_timeout_seconds;
            }
        }
        location
    }

    /// Expand a list of locations in order.
    ///
    /// Group locations are replaced in place by their ordered concrete
    /// membership (enabled stores only), deduplicated by store key against
    /// entries already added. Cache-only references to non-hosted stores are
    /// materialized from the registry.
    ///
    /// # Errors
    /// [`ContentError::MissingStore`] when a non-hosted cache-only reference
    /// no longer resolves to a live store. That reference was valid when
    /// created, so its absence is a hard error, unlike dangling group
    /// membership.
    pub fn expand(&self, locations: Vec<Location>) -> Result<Vec<Location>, ContentError> {
        let mut result: Vec<Location> = Vec::new();

        for location in locations {
            match location {
                Location::Group(group) => {
                    tracing::debug!(group = %group.key, "expanding group");
                    let members = self
                        .registry
                        .query()
                        .enabled_only(true)
                        .ordered_concrete_stores_in_group(&group.key);

                    for member in members {
                        if result.iter().any(|l| l.key() == member.key()) {
                            continue;
                        }
                        tracing::debug!(member = %member.key(), "expansion +=");
                        result.push(self.location_for(&member));
                    }
                }
                Location::CacheOnly(cache) if !cache.hosted => {
                    let store = self
                        .registry
                        .get(&cache.key)
                        .ok_or(ContentError::MissingStore {
                            key: cache.key.clone(),
                        })?;
                    tracing::debug!(store = %store.key(), "materializing single store");
                    result.push(self.location_for(&store));
                }
                other => result.push(other),
            }
        }

        Ok(result)
    }

    /// Expand a path-bearing reference into a [`VirtualResource`] whose
    /// resources carry the same ordering discipline as [`expand`](Self::expand).
    pub fn expand_resource(&self, resource: Resource) -> Result<VirtualResource, ContentError> {
        match resource {
            Resource::Concrete(concrete) => {
                let locations = self.expand(vec![concrete.location])?;
                Ok(VirtualResource::new(locations, &concrete.path))
            }
            Resource::Virtual(virtual_resource) => {
                let mut expanded: Vec<ConcreteResource> = Vec::new();
                for concrete in virtual_resource {
                    for location in self.expand(vec![concrete.location])? {
                        expanded.push(ConcreteResource::new(location, concrete.path.clone()));
                    }
                }
                Ok(VirtualResource::from_resources(expanded))
            }
        }
    }
}
