//! Concurrent store registry
//!
//! [`StoreRegistry`] is the single source of truth for repository
//! definitions, keyed by [`StoreKey`]. It is shared across request-handling
//! tasks; every mutation is atomic per key, and every read that feeds a
//! resolution takes a copied snapshot so resolution never observes a torn
//! state (different calls may still see different snapshots).

use crate::error::RegistryError;
use crate::event::{NoOpDispatcher, StoreEvent, StoreEventDispatcher, StoreEventType};
use crate::query::StoreQuery;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use depot_model::{ArtifactStore, StoreKey, StoreType};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, concurrently-mutable registry of repository definitions
///
/// Beyond key uniqueness, no cross-store invariant is enforced here: a group
/// may reference keys that do not (or no longer) exist, and deleting a store
/// leaves references to it in place. Callers wanting stronger guarantees
/// perform their own check-then-act and accept the race window.
#[derive(Debug)]
pub struct StoreRegistry {
    stores: DashMap<StoreKey, ArtifactStore>,
    dispatcher: Arc<dyn StoreEventDispatcher>,
}

impl StoreRegistry {
    /// Create an empty registry with a no-op event dispatcher
    #[must_use]
    pub fn new() -> Self {
        Self::with_dispatcher(Arc::new(NoOpDispatcher))
    }

    /// Create an empty registry with the given event dispatcher
    #[must_use]
    pub fn with_dispatcher(dispatcher: Arc<dyn StoreEventDispatcher>) -> Self {
        Self {
            stores: DashMap::new(),
            dispatcher,
        }
    }

    /// Upsert a store definition.
    ///
    /// Returns whether a change occurred: false when the identical definition
    /// was already present (in which case no event fires). With
    /// `fail_if_exists`, any live store under the key is a collision.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyExists`] on a fail-if-exists collision.
    pub fn put(&self, store: ArtifactStore, fail_if_exists: bool) -> Result<bool, RegistryError> {
        let key = store.key().clone();
        let event_type = match self.stores.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if fail_if_exists {
                    return Err(RegistryError::AlreadyExists { key });
                }
                if occupied.get() == &store {
                    tracing::debug!(%key, "store unchanged, skipping event");
                    return Ok(false);
                }
                occupied.insert(store.clone());
                StoreEventType::Update
            }
            Entry::Vacant(vacant) => {
                vacant.insert(store.clone());
                StoreEventType::Add
            }
        };

        tracing::debug!(%key, ?event_type, "stored definition");
        self.dispatcher
            .dispatch(&StoreEvent::single(event_type, store));
        Ok(true)
    }

    /// Look up a store by key (snapshot copy)
    #[must_use]
    pub fn get(&self, key: &StoreKey) -> Option<ArtifactStore> {
        self.stores.get(key).map(|entry| entry.value().clone())
    }

    /// True when a store exists under the key
    #[inline]
    #[must_use]
    pub fn has(&self, key: &StoreKey) -> bool {
        self.stores.contains_key(key)
    }

    /// Remove a store definition.
    ///
    /// Removing a missing key is a no-op. References to the removed key in
    /// group membership stay in place (dangling references are a valid
    /// state).
    ///
    /// # Errors
    /// [`RegistryError::ReadOnly`] when the key names a readonly hosted
    /// store; it must be made writable before deletion.
    pub fn remove(&self, key: &StoreKey) -> Result<Option<ArtifactStore>, RegistryError> {
        let removed = self
            .stores
            .remove_if(key, |_, store| !store.is_readonly_hosted());

        match removed {
            Some((_, store)) => {
                tracing::info!(%key, "removed store");
                self.dispatcher
                    .dispatch(&StoreEvent::single(StoreEventType::Delete, store.clone()));
                Ok(Some(store))
            }
            None if self.stores.contains_key(key) => {
                Err(RegistryError::ReadOnly { key: key.clone() })
            }
            None => {
                tracing::debug!(%key, "no store to remove");
                Ok(None)
            }
        }
    }

    /// Snapshot of every store definition
    #[must_use]
    pub fn all_stores(&self) -> Vec<ArtifactStore> {
        self.stores
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Snapshot map of the full key space
    ///
    /// A copied snapshot, not a live view; safe to iterate while the
    /// registry mutates underneath.
    #[must_use]
    pub fn stores_by_key(&self) -> HashMap<StoreKey, ArtifactStore> {
        self.stores
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Lazy sequence over a point-in-time snapshot of the key space
    ///
    /// The snapshot is taken when this method is called; each call restarts
    /// from a fresh snapshot.
    #[must_use]
    pub fn stream_keys(&self) -> impl Iterator<Item = StoreKey> {
        let keys: Vec<StoreKey> = self.stores.iter().map(|entry| entry.key().clone()).collect();
        keys.into_iter()
    }

    /// Snapshot of all stores of one type
    #[must_use]
    pub fn all_of_type(&self, store_type: StoreType) -> Vec<ArtifactStore> {
        self.stores
            .iter()
            .filter(|entry| entry.key().store_type() == store_type)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Snapshot of all non-group stores
    #[must_use]
    pub fn all_concrete(&self) -> Vec<ArtifactStore> {
        self.stores
            .iter()
            .filter(|entry| entry.key().store_type().is_concrete())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Look up a hosted store by package type and name
    #[must_use]
    pub fn hosted(&self, package_type: &str, name: &str) -> Option<ArtifactStore> {
        self.get(&StoreKey::new(package_type, StoreType::Hosted, name))
    }

    /// Look up a remote store by package type and name
    #[must_use]
    pub fn remote(&self, package_type: &str, name: &str) -> Option<ArtifactStore> {
        self.get(&StoreKey::new(package_type, StoreType::Remote, name))
    }

    /// Look up a group by package type and name
    #[must_use]
    pub fn group(&self, package_type: &str, name: &str) -> Option<ArtifactStore> {
        self.get(&StoreKey::new(package_type, StoreType::Group, name))
    }

    /// Find the remote store proxying `url`, comparing scheme- and
    /// trailing-slash-insensitively. Ties resolve to the lowest key.
    #[must_use]
    pub fn find_remote_by_url(&self, package_type: &str, url: &str) -> Option<ArtifactStore> {
        let wanted = normalize_url(url);
        let mut matches: Vec<ArtifactStore> = self
            .stores
            .iter()
            .filter(|entry| {
                entry.key().store_type() == StoreType::Remote
                    && entry.key().package_type() == package_type
            })
            .filter(|entry| {
                entry
                    .value()
                    .as_remote()
                    .is_some_and(|remote| normalize_url(&remote.url) == wanted)
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| a.key().cmp(b.key()));
        matches.into_iter().next()
    }

    /// True when the registry holds no stores
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Number of stores
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Remove every store, emitting one delete event for all of them
    /// (sorted by key)
    pub fn clear(&self) {
        let mut removed = self.all_stores();
        self.stores.clear();
        if removed.is_empty() {
            return;
        }
        removed.sort_by(|a, b| a.key().cmp(b.key()));
        self.dispatcher.dispatch(&StoreEvent {
            event_type: StoreEventType::Delete,
            stores: removed,
        });
    }

    /// Flip the rescan-in-progress flag on a live store.
    ///
    /// Observability-only transient state: no change event fires, and the
    /// flag is not part of the persisted definition. Returns false when the
    /// key has no live store.
    pub fn mark_rescan(&self, key: &StoreKey, in_progress: bool) -> bool {
        match self.stores.get_mut(key) {
            Some(mut entry) => {
                entry.value_mut().rescan_in_progress = in_progress;
                true
            }
            None => false,
        }
    }

    /// Start a query over a snapshot of the current key space
    ///
    /// The snapshot is captured here; concurrent registry mutation affects
    /// only subsequent queries, never this one.
    #[must_use]
    pub fn query(&self) -> StoreQuery {
        StoreQuery::from_snapshot(self.stores_by_key())
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_url(url: &str) -> &str {
    let url = url.trim();
    let url = url.split_once("://").map_or(url, |(_, rest)| rest);
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StoreEventDispatcher;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Recording {
        events: Mutex<Vec<(StoreEventType, Vec<StoreKey>)>>,
    }

    impl Recording {
        fn types(&self) -> Vec<StoreEventType> {
            self.events.lock().iter().map(|(t, _)| *t).collect()
        }
    }

    impl StoreEventDispatcher for Recording {
        fn dispatch(&self, event: &StoreEvent) {
            self.events.lock().push((
                event.event_type,
                event.stores.iter().map(|s| s.key().clone()).collect(),
            ));
        }
    }

    fn recording_registry() -> (StoreRegistry, Arc<Recording>) {
        let recorder = Arc::new(Recording::default());
        (
            StoreRegistry::with_dispatcher(recorder.clone()),
            recorder,
        )
    }

    #[test]
    fn put_and_get_round_trip() {
        let registry = StoreRegistry::new();
        let store = ArtifactStore::hosted("maven", "local");

        assert!(registry.put(store.clone(), false).unwrap());
        assert!(registry.has(store.key()));
        assert_eq!(registry.get(store.key()), Some(store));
    }

    #[test]
    fn put_fail_if_exists_rejects_collision() {
        let registry = StoreRegistry::new();
        let store = ArtifactStore::hosted("maven", "local");

        registry.put(store.clone(), true).unwrap();
        let err = registry.put(store, true).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
    }

    #[test]
    fn put_identical_definition_reports_no_change() {
        let (registry, recorder) = recording_registry();
        let store = ArtifactStore::hosted("maven", "local");

        assert!(registry.put(store.clone(), false).unwrap());
        assert!(!registry.put(store.clone(), false).unwrap());

        let changed = store.with_description("deploy target");
        assert!(registry.put(changed, false).unwrap());

        assert_eq!(
            recorder.types(),
            vec![StoreEventType::Add, StoreEventType::Update]
        );
    }

    #[test]
    fn remove_returns_the_store_and_fires_delete() {
        let (registry, recorder) = recording_registry();
        let store = ArtifactStore::remote("maven", "central", "https://repo.example.org/");
        registry.put(store.clone(), false).unwrap();

        let removed = registry.remove(store.key()).unwrap();
        assert_eq!(removed, Some(store.clone()));
        assert!(!registry.has(store.key()));
        assert_eq!(
            recorder.types(),
            vec![StoreEventType::Add, StoreEventType::Delete]
        );

        // Removing again is a no-op without an event.
        assert_eq!(registry.remove(store.key()).unwrap(), None);
        assert_eq!(recorder.types().len(), 2);
    }

    #[test]
    fn remove_readonly_hosted_is_refused() {
        let registry = StoreRegistry::new();
        let mut store = ArtifactStore::hosted("maven", "frozen");
        store.as_hosted_mut().unwrap().readonly = true;
        registry.put(store.clone(), false).unwrap();

        let err = registry.remove(store.key()).unwrap_err();
        assert!(matches!(err, RegistryError::ReadOnly { .. }));
        assert!(registry.has(store.key()));
    }

    #[test]
    fn delete_does_not_cascade_into_group_membership() {
        let registry = StoreRegistry::new();
        let remote = ArtifactStore::remote("maven", "central", "https://repo.example.org/");
        let group = ArtifactStore::group("maven", "public", vec![remote.key().clone()]);
        registry.put(remote.clone(), false).unwrap();
        registry.put(group.clone(), false).unwrap();

        registry.remove(remote.key()).unwrap();

        // The dangling reference is an observable, valid state.
        let dangling = registry.get(group.key()).unwrap();
        assert_eq!(
            dangling.as_group().unwrap().constituents,
            vec![remote.key().clone()]
        );
    }

    #[test]
    fn snapshots_are_copies_not_views() {
        let registry = StoreRegistry::new();
        registry
            .put(ArtifactStore::hosted("maven", "local"), false)
            .unwrap();

        let snapshot = registry.stores_by_key();
        let keys: Vec<StoreKey> = registry.stream_keys().collect();
        registry.clear();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(keys.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_fires_single_delete_event_sorted_by_key() {
        let (registry, recorder) = recording_registry();
        registry
            .put(ArtifactStore::hosted("maven", "zeta"), false)
            .unwrap();
        registry
            .put(ArtifactStore::hosted("maven", "alpha"), false)
            .unwrap();

        registry.clear();

        let events = recorder.events.lock();
        let (event_type, keys) = events.last().unwrap();
        assert_eq!(*event_type, StoreEventType::Delete);
        assert_eq!(
            keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["maven:hosted:alpha", "maven:hosted:zeta"]
        );
    }

    #[test]
    fn typed_lookups_use_constructed_keys() {
        let registry = StoreRegistry::new();
        registry
            .put(
                ArtifactStore::remote("maven", "central", "https://repo.example.org/"),
                false,
            )
            .unwrap();

        assert!(registry.remote("maven", "central").is_some());
        assert!(registry.hosted("maven", "central").is_none());
        assert_eq!(registry.all_of_type(StoreType::Remote).len(), 1);
        assert_eq!(registry.all_concrete().len(), 1);
    }

    #[test]
    fn find_remote_by_url_ignores_scheme_and_trailing_slash() {
        let registry = StoreRegistry::new();
        registry
            .put(
                ArtifactStore::remote("maven", "central", "https://repo.example.org/maven2/"),
                false,
            )
            .unwrap();

        let found = registry
            .find_remote_by_url("maven", "http://repo.example.org/maven2")
            .unwrap();
        assert_eq!(found.name(), "central");

        assert!(registry
            .find_remote_by_url("maven", "https://other.example.org/")
            .is_none());
    }

    #[test]
    fn mark_rescan_flips_transient_flag_without_event() {
        let (registry, recorder) = recording_registry();
        let store = ArtifactStore::hosted("maven", "local");
        registry.put(store.clone(), false).unwrap();

        assert!(registry.mark_rescan(store.key(), true));
        assert!(registry.get(store.key()).unwrap().rescan_in_progress);
        assert!(registry.mark_rescan(store.key(), false));
        assert!(!registry.get(store.key()).unwrap().rescan_in_progress);

        assert_eq!(recorder.types(), vec![StoreEventType::Add]);

        let missing = StoreKey::new("maven", StoreType::Hosted, "nope");
        assert!(!registry.mark_rescan(&missing, true));
    }
}
