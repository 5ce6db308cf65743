//! Content resolution engine
//!
//! The request-facing API: retrieve, store, delete, list, rescan, and digest
//! content across one or many repositories. The engine owns the sequencing
//! and policy (iteration order, first-match precedence, write eligibility)
//! and delegates byte movement to the [`ContentTransport`] backend.
//!
//! Failure discipline: a transport failure in one store during a multi-store
//! scan is logged and that store contributes nothing; a failure on the
//! designated write/delete target is fatal and surfaces to the caller. The
//! engine never retries.

use crate::config::DepotConfig;
use crate::digest::DigestAlgorithm;
use crate::error::ContentError;
use crate::expander::LocationExpander;
use crate::location::{ConcreteResource, Location, Resource, VirtualResource};
use crate::transport::{
    ContentStream, ContentTransport, StoreResource, Transfer, TransferOperation,
};
use dashmap::DashMap;
use depot_model::{ArtifactPathInfo, ArtifactStore, StoreKey, StoreKind};
use depot_registry::StoreRegistry;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sequences content operations across stores
pub struct ContentEngine {
    registry: Arc<StoreRegistry>,
    expander: LocationExpander,
    transport: Arc<dyn ContentTransport>,
    /// Stores with a rescan underway; concurrent rescans of one store
    /// coalesce into the first.
    rescans: DashMap<StoreKey, ()>,
}

impl ContentEngine {
    /// Create an engine with default config
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>, transport: Arc<dyn ContentTransport>) -> Self {
        Self::with_config(registry, transport, DepotConfig::default())
    }

    /// Create an engine with explicit config
    #[must_use]
    pub fn with_config(
        registry: Arc<StoreRegistry>,
        transport: Arc<dyn ContentTransport>,
        config: DepotConfig,
    ) -> Self {
        Self {
            expander: LocationExpander::with_config(registry.clone(), config),
            registry,
            transport,
            rescans: DashMap::new(),
        }
    }

    /// The expander this engine resolves virtual references through
    #[inline]
    #[must_use]
    pub fn expander(&self) -> &LocationExpander {
        &self.expander
    }

    /// Retrieve the first existing transfer for `path` across `stores`, in
    /// caller-supplied order (groups are flattened in place).
    ///
    /// Short-circuits on the first hit; stores after it are never queried.
    /// Absence everywhere is `Ok(None)`, not an error. Transport failures in
    /// individual stores are logged and skipped.
    pub async fn retrieve_first(
        &self,
        stores: &[ArtifactStore],
        path: &str,
    ) -> Result<Option<Transfer>, ContentError> {
        let resources = self.expand_enabled(stores, path)?;
        for resource in resources.resources() {
            match self.transport.retrieve(resource).await {
                Ok(Some(transfer)) => return Ok(Some(transfer)),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(store = %resource.key(), path, error = %err,
                        "transport failure; skipping store");
                }
            }
        }
        Ok(None)
    }

    /// Retrieve every existing transfer for `path` across `stores`, in order
    pub async fn retrieve_all(
        &self,
        stores: &[ArtifactStore],
        path: &str,
    ) -> Result<Vec<Transfer>, ContentError> {
        let resources = self.expand_enabled(stores, path)?;
        let mut transfers = Vec::new();
        for resource in resources.resources() {
            match self.transport.retrieve(resource).await {
                Ok(Some(transfer)) => transfers.push(transfer),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(store = %resource.key(), path, error = %err,
                        "transport failure; skipping store");
                }
            }
        }
        Ok(transfers)
    }

    /// Retrieve from a single store. Disabled stores and bare group
    /// references resolve to `Ok(None)`; transport failures propagate.
    pub async fn retrieve(
        &self,
        store: &ArtifactStore,
        path: &str,
    ) -> Result<Option<Transfer>, ContentError> {
        if store.disabled || !store.is_concrete() {
            return Ok(None);
        }
        let resource = ConcreteResource::new(self.expander.location_for(store), path);
        Ok(self.transport.retrieve(&resource).await?)
    }

    /// Store content, enforcing write eligibility.
    ///
    /// The target must be a hosted store, or a group whose flattened
    /// membership contains an eligible hosted store; the first one in
    /// resolution order becomes the write target. A transport failure on the
    /// selected target is fatal.
    ///
    /// # Errors
    /// - [`ContentError::ReadOnly`] for a readonly hosted target
    /// - [`ContentError::WriteNotAllowed`] when store policy rejects the
    ///   artifact class, the target is not hosted, or a group has no
    ///   eligible member
    pub async fn store(
        &self,
        store: &ArtifactStore,
        path: &str,
        content: ContentStream,
        op: TransferOperation,
    ) -> Result<Transfer, ContentError> {
        if store.disabled {
            return Err(ContentError::WriteNotAllowed {
                key: store.key().clone(),
                path: path.to_string(),
                reason: "store is disabled".to_string(),
            });
        }

        match store.kind() {
            StoreKind::Group(_) => {
                let members = self
                    .registry
                    .query()
                    .enabled_only(true)
                    .ordered_concrete_stores_in_group(store.key());
                let path_info = ArtifactPathInfo::parse(path);

                let selected = members
                    .iter()
                    .find(|member| store_is_suitable_for(member, path_info.as_ref(), op));
                match selected {
                    Some(member) => {
                        tracing::info!(group = %store.key(), target = %member.key(), path,
                            "storing via group");
                        self.store_hosted(member, path, content).await
                    }
                    None => Err(ContentError::WriteNotAllowed {
                        key: store.key().clone(),
                        path: path.to_string(),
                        reason: "no hosted member can accept this artifact".to_string(),
                    }),
                }
            }
            StoreKind::Remote(_) => Err(ContentError::WriteNotAllowed {
                key: store.key().clone(),
                path: path.to_string(),
                reason: "cannot deploy to a non-hosted store".to_string(),
            }),
            StoreKind::Hosted(_) => self.store_hosted(store, path, content).await,
        }
    }

    /// Store into the first store of `stores` suitable for the operation
    /// (first-occurrence precedence, mirroring retrieval order).
    ///
    /// # Errors
    /// [`ContentError::NoSuitableStore`] when nothing in the list qualifies.
    pub async fn store_any(
        &self,
        stores: &[ArtifactStore],
        path: &str,
        content: ContentStream,
        op: TransferOperation,
    ) -> Result<Transfer, ContentError> {
        let path_info = ArtifactPathInfo::parse(path);
        let selected = stores
            .iter()
            .find(|store| store_is_suitable_for(store, path_info.as_ref(), op));

        match selected {
            Some(store) => {
                tracing::info!(target = %store.key(), path, "storing in selected store");
                self.store_hosted(store, path, content).await
            }
            None => {
                tracing::warn!(path, "no valid deploy target in store list");
                Err(ContentError::NoSuitableStore {
                    path: path.to_string(),
                })
            }
        }
    }

    async fn store_hosted(
        &self,
        store: &ArtifactStore,
        path: &str,
        content: ContentStream,
    ) -> Result<Transfer, ContentError> {
        let Some(hosted) = store.as_hosted() else {
            return Err(ContentError::WriteNotAllowed {
                key: store.key().clone(),
                path: path.to_string(),
                reason: "cannot deploy to a non-hosted store".to_string(),
            });
        };

        if hosted.readonly {
            return Err(ContentError::ReadOnly {
                key: store.key().clone(),
            });
        }

        if let Some(info) = ArtifactPathInfo::parse(path) {
            if info.is_snapshot() && !hosted.allow_snapshots {
                tracing::error!(store = %store.key(), path,
                    "cannot store snapshot in non-snapshot store");
                return Err(ContentError::WriteNotAllowed {
                    key: store.key().clone(),
                    path: path.to_string(),
                    reason: "snapshots are not allowed".to_string(),
                });
            }
            if !info.is_snapshot() && !hosted.allow_releases {
                tracing::error!(store = %store.key(), path,
                    "cannot store release in snapshot-only store");
                return Err(ContentError::WriteNotAllowed {
                    key: store.key().clone(),
                    path: path.to_string(),
                    reason: "releases are not allowed".to_string(),
                });
            }
        }

        let resource = ConcreteResource::new(self.expander.location_for(store), path);
        Ok(self.transport.store(&resource, content).await?)
    }

    /// Delete content from a store. Groups delete from every concrete member
    /// in resolution order; errors on any target propagate (delete targets
    /// are always designated targets).
    ///
    /// Returns whether anything was removed. Disabled stores are a no-op.
    pub async fn delete(&self, store: &ArtifactStore, path: &str) -> Result<bool, ContentError> {
        if store.disabled {
            return Ok(false);
        }

        if let StoreKind::Group(_) = store.kind() {
            let members = self
                .registry
                .query()
                .enabled_only(true)
                .ordered_concrete_stores_in_group(store.key());
            let mut removed = false;
            for member in &members {
                removed = self.delete_concrete(member, path).await? || removed;
            }
            return Ok(removed);
        }

        self.delete_concrete(store, path).await
    }

    /// Delete content from every store in the list; returns whether any
    /// delete removed something
    pub async fn delete_all(
        &self,
        stores: &[ArtifactStore],
        path: &str,
    ) -> Result<bool, ContentError> {
        let mut removed = false;
        for store in stores {
            if store.disabled {
                continue;
            }
            removed = self.delete(store, path).await? || removed;
        }
        Ok(removed)
    }

    async fn delete_concrete(
        &self,
        store: &ArtifactStore,
        path: &str,
    ) -> Result<bool, ContentError> {
        if store.is_readonly_hosted() {
            return Err(ContentError::ReadOnly {
                key: store.key().clone(),
            });
        }
        let resource = ConcreteResource::new(self.expander.location_for(store), path);
        Ok(self.transport.delete(&resource).await?)
    }

    /// Refresh the cached view of a store without deleting backing content.
    ///
    /// Marks `rescan_in_progress` on the registry entry for observability and
    /// clears it on completion or failure. A rescan already underway for the
    /// same store coalesces into a no-op. Callers wanting fire-and-forget
    /// behavior spawn this future.
    pub async fn rescan(&self, store: &ArtifactStore) -> Result<(), ContentError> {
        if store.disabled {
            return Ok(());
        }
        let key = store.key().clone();
        if self.rescans.insert(key.clone(), ()).is_some() {
            tracing::debug!(store = %key, "rescan already in progress");
            return Ok(());
        }

        self.registry.mark_rescan(&key, true);
        let walk = self.walk_refresh(store).await;
        self.registry.mark_rescan(&key, false);
        self.rescans.remove(&key);
        walk
    }

    /// Rescan each store in the list, sequentially
    pub async fn rescan_all(&self, stores: &[ArtifactStore]) -> Result<(), ContentError> {
        for store in stores {
            self.rescan(store).await?;
        }
        Ok(())
    }

    async fn walk_refresh(&self, store: &ArtifactStore) -> Result<(), ContentError> {
        let location = self.expander.location_for(store);
        let mut dirs = vec![String::new()];

        while let Some(dir) = dirs.pop() {
            let resource = ConcreteResource::new(location.clone(), dir);
            let entries = self.transport.list_dir(&resource).await?;
            for entry in entries {
                let child = resource.child(entry.trim_end_matches('/'));
                if entry.ends_with('/') {
                    dirs.push(child.path);
                } else {
                    self.transport.refresh(&child).await?;
                }
            }
        }
        Ok(())
    }

    /// Directory-style listing. For a group, listings from all concrete
    /// members merge in resolution order, deduplicated by entry name with
    /// first occurrence winning: a higher-precedence repository's copy of a
    /// file owns the name in the merged view.
    pub async fn list(
        &self,
        store: &ArtifactStore,
        path: &str,
    ) -> Result<Vec<StoreResource>, ContentError> {
        if store.disabled {
            return Ok(Vec::new());
        }

        if store.is_concrete() {
            let resource = ConcreteResource::new(self.expander.location_for(store), path);
            let entries = self.transport.list_dir(&resource).await?;
            return Ok(entries
                .into_iter()
                .map(|name| StoreResource {
                    key: store.key().clone(),
                    path: path.to_string(),
                    name,
                })
                .collect());
        }

        let resources = self.expand_enabled(std::slice::from_ref(store), path)?;
        Ok(self.merge_listings(&resources, path).await)
    }

    /// Merged listing across a list of stores, same ordering discipline as
    /// [`list`](Self::list)
    pub async fn list_all(
        &self,
        stores: &[ArtifactStore],
        path: &str,
    ) -> Result<Vec<StoreResource>, ContentError> {
        let resources = self.expand_enabled(stores, path)?;
        Ok(self.merge_listings(&resources, path).await)
    }

    async fn merge_listings(&self, resources: &VirtualResource, path: &str) -> Vec<StoreResource> {
        let mut merged: IndexMap<String, StoreResource> = IndexMap::new();
        for resource in resources.resources() {
            match self.transport.list_dir(resource).await {
                Ok(entries) => {
                    for name in entries {
                        merged.entry(name.clone()).or_insert_with(|| StoreResource {
                            key: resource.key().clone(),
                            path: path.to_string(),
                            name,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(store = %resource.key(), path, error = %err,
                        "listing failed; skipping store");
                }
            }
        }
        merged.into_values().collect()
    }

    /// Cache reference for a path in a store, without touching the backend.
    /// `Ok(None)` for disabled stores.
    ///
    /// # Errors
    /// [`ContentError::MissingStore`] when the key has no live store.
    pub fn storage_reference(
        &self,
        key: &StoreKey,
        path: &str,
    ) -> Result<Option<Transfer>, ContentError> {
        let store = self
            .registry
            .get(key)
            .ok_or_else(|| ContentError::MissingStore { key: key.clone() })?;
        if store.disabled {
            return Ok(None);
        }
        let resource = ConcreteResource::new(self.expander.location_for(&store), path);
        Ok(Some(self.transport.cache_reference(&resource)))
    }

    /// Cache reference in the first store of the list suitable for the
    /// operation. Download/listing operations additionally require the
    /// content to exist.
    ///
    /// # Errors
    /// [`ContentError::NoSuitableStore`] when nothing qualifies.
    pub async fn storage_reference_any(
        &self,
        stores: &[ArtifactStore],
        path: &str,
        op: TransferOperation,
    ) -> Result<Transfer, ContentError> {
        let path_info = ArtifactPathInfo::parse(path);
        for store in stores {
            if !store_is_suitable_for(store, path_info.as_ref(), op) {
                continue;
            }
            let resource = ConcreteResource::new(self.expander.location_for(store), path);
            let needs_existing =
                matches!(op, TransferOperation::Download | TransferOperation::Listing);
            if needs_existing {
                match self.transport.exists(&resource).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        tracing::warn!(store = %store.key(), path, error = %err,
                            "existence check failed; skipping store");
                        continue;
                    }
                }
            }
            return Ok(self.transport.cache_reference(&resource));
        }
        Err(ContentError::NoSuitableStore {
            path: path.to_string(),
        })
    }

    /// Every file transfer under `start` in the store, depth-first
    ///
    /// # Errors
    /// [`ContentError::MissingStore`] when the key has no live store;
    /// transport failures propagate.
    pub async fn list_recursively(
        &self,
        key: &StoreKey,
        start: &str,
    ) -> Result<Vec<Transfer>, ContentError> {
        let store = self
            .registry
            .get(key)
            .ok_or_else(|| ContentError::MissingStore { key: key.clone() })?;
        if !store.is_concrete() {
            return Ok(Vec::new());
        }

        let location = self.expander.location_for(&store);
        let mut transfers = Vec::new();
        let mut dirs = vec![start.to_string()];

        while let Some(dir) = dirs.pop() {
            let resource = ConcreteResource::new(location.clone(), dir);
            let entries = self.transport.list_dir(&resource).await?;
            for entry in entries {
                let child = resource.child(entry.trim_end_matches('/'));
                if entry.ends_with('/') {
                    dirs.push(child.path);
                } else {
                    transfers.push(self.transport.cache_reference(&child));
                }
            }
        }
        Ok(transfers)
    }

    /// Compute digests of resolvable content.
    ///
    /// Resolution follows [`retrieve_first`](Self::retrieve_first) semantics
    /// against the named store (groups flatten as usual).
    ///
    /// # Errors
    /// [`ContentError::MissingStore`] for a dead key,
    /// [`ContentError::NotFound`] when the path resolves nowhere.
    pub async fn digest(
        &self,
        key: &StoreKey,
        path: &str,
        algorithms: &[DigestAlgorithm],
    ) -> Result<BTreeMap<DigestAlgorithm, String>, ContentError> {
        let store = self
            .registry
            .get(key)
            .ok_or_else(|| ContentError::MissingStore { key: key.clone() })?;

        let transfer = self
            .retrieve_first(std::slice::from_ref(&store), path)
            .await?
            .ok_or_else(|| ContentError::NotFound {
                key: key.clone(),
                path: path.to_string(),
            })?;

        let bytes = self.transport.open(&transfer).await?;
        Ok(algorithms
            .iter()
            .map(|algorithm| (*algorithm, algorithm.hex_digest(&bytes)))
            .collect())
    }

    fn expand_enabled(
        &self,
        stores: &[ArtifactStore],
        path: &str,
    ) -> Result<VirtualResource, ContentError> {
        let locations: Vec<Location> = stores
            .iter()
            .filter(|store| {
                if store.disabled {
                    tracing::debug!(store = %store.key(), "store is disabled; skipping");
                    false
                } else {
                    true
                }
            })
            .map(|store| self.expander.location_for(store))
            .collect();

        self.expander
            .expand_resource(Resource::Virtual(VirtualResource::new(locations, path)))
    }
}

/// Whether a store can serve as the target of `op` for the given artifact
/// classification. Upload targets must be writable hosted stores whose policy
/// accepts the artifact class; unparseable paths (metadata, checksums) are
/// storable in any writable hosted store.
fn store_is_suitable_for(
    store: &ArtifactStore,
    path_info: Option<&ArtifactPathInfo>,
    op: TransferOperation,
) -> bool {
    if store.disabled {
        return false;
    }
    if op != TransferOperation::Upload {
        return true;
    }
    let Some(hosted) = store.as_hosted() else {
        return false;
    };
    if hosted.readonly {
        return false;
    }
    match path_info {
        None => true,
        Some(info) if info.is_snapshot() => hosted.allow_snapshots,
        Some(_) => hosted.allow_releases,
    }
}
