//! Group membership resolution
//!
//! [`StoreQuery`] holds a copied snapshot of the registry's key space and
//! answers membership questions over it: ordered flattening of a group's
//! (possibly nested, possibly cyclic) membership graph, and the reverse
//! lookups used for invalidation: which groups directly contain a key, and
//! which groups are transitively affected by a set of keys.
//!
//! A query is a pure function over its snapshot: repeated calls return the
//! same answer, and concurrent registry mutation only affects queries created
//! afterwards.

use depot_model::{ArtifactStore, StoreKey, StoreType};
use std::collections::{HashMap, HashSet};

/// Membership queries over a point-in-time registry snapshot
#[derive(Debug, Clone)]
pub struct StoreQuery {
    snapshot: HashMap<StoreKey, ArtifactStore>,
    enabled_only: bool,
}

impl StoreQuery {
    /// Build a query over an explicit snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: HashMap<StoreKey, ArtifactStore>) -> Self {
        Self {
            snapshot,
            enabled_only: false,
        }
    }

    /// Restrict results to enabled stores: disabled groups contribute
    /// nothing, and disabled concrete stores are excluded
    #[must_use]
    pub fn enabled_only(mut self, enabled_only: bool) -> Self {
        self.enabled_only = enabled_only;
        self
    }

    /// The snapshot this query runs over
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &HashMap<StoreKey, ArtifactStore> {
        &self.snapshot
    }

    /// Ordered, depth-first flattening of a group's membership restricted to
    /// concrete (hosted/remote) leaves.
    ///
    /// Nested groups are recursed into in place; every visited key lands in a
    /// seen-set, so cycles terminate and the first occurrence of a store
    /// keeps the earliest position. Keys with no live store are skipped
    /// silently. A missing or non-group `group_key` yields an empty list.
    #[must_use]
    pub fn ordered_concrete_stores_in_group(&self, group_key: &StoreKey) -> Vec<ArtifactStore> {
        self.group_ordering(group_key, false, true)
    }

    /// Same traversal, but intermediate group nodes are included in the
    /// output at their encountered position (used for auditing).
    #[must_use]
    pub fn ordered_stores_in_group(&self, group_key: &StoreKey) -> Vec<ArtifactStore> {
        self.group_ordering(group_key, true, true)
    }

    /// Groups whose direct membership contains `key` (one hop, not
    /// transitive), sorted by key.
    #[must_use]
    pub fn groups_containing(&self, key: &StoreKey) -> Vec<ArtifactStore> {
        let mut result: Vec<ArtifactStore> = self
            .snapshot
            .values()
            .filter(|store| !(self.enabled_only && store.disabled))
            .filter(|store| {
                store
                    .as_group()
                    .is_some_and(|group| group.constituents.contains(key))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.key().cmp(b.key()));
        result
    }

    /// Transitive closure of groups affected by any of `keys`: groups that
    /// contain a key directly, groups that contain those groups, and so on
    /// to a fixed point. Sorted by key.
    ///
    /// Worklist algorithm: each key is processed at most once, so the walk
    /// terminates even when group membership is cyclic.
    #[must_use]
    pub fn groups_affected_by<I>(&self, keys: I) -> Vec<ArtifactStore>
    where
        I: IntoIterator<Item = StoreKey>,
    {
        let mut to_process: Vec<StoreKey> = keys.into_iter().collect();
        let mut processed: HashSet<StoreKey> = HashSet::new();
        let mut affected: HashMap<StoreKey, ArtifactStore> = HashMap::new();

        while let Some(next) = to_process.pop() {
            if !processed.insert(next.clone()) {
                continue;
            }

            for store in self.snapshot.values() {
                if processed.contains(store.key()) {
                    continue;
                }
                let Some(group) = store.as_group() else {
                    continue;
                };
                if group.constituents.contains(&next)
                    && !affected.contains_key(store.key())
                {
                    tracing::debug!(group = %store.key(), member = %next, "group affected");
                    affected.insert(store.key().clone(), store.clone());
                    // The group may itself be a member of another group;
                    // recurse upwards.
                    to_process.push(store.key().clone());
                }
            }
        }

        let mut result: Vec<ArtifactStore> = affected.into_values().collect();
        result.sort_by(|a, b| a.key().cmp(b.key()));
        result
    }

    fn group_ordering(
        &self,
        group_key: &StoreKey,
        include_groups: bool,
        recurse_groups: bool,
    ) -> Vec<ArtifactStore> {
        let Some(master) = self.snapshot.get(group_key) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(group_key.clone());
        self.recurse_group(master, &mut result, &mut seen, include_groups, recurse_groups);
        result
    }

    fn recurse_group(
        &self,
        master: &ArtifactStore,
        result: &mut Vec<ArtifactStore>,
        seen: &mut HashSet<StoreKey>,
        include_groups: bool,
        recurse_groups: bool,
    ) {
        if self.enabled_only && master.disabled {
            return;
        }
        let Some(group) = master.as_group() else {
            return;
        };

        if include_groups {
            result.push(master.clone());
        }

        for key in &group.constituents {
            if !seen.insert(key.clone()) {
                continue;
            }

            if recurse_groups && key.store_type() == StoreType::Group {
                if let Some(member) = self.snapshot.get(key) {
                    self.recurse_group(member, result, seen, include_groups, recurse_groups);
                }
            } else if let Some(store) = self.snapshot.get(key) {
                if !(self.enabled_only && store.disabled) {
                    result.push(store.clone());
                }
            }
            // Keys with no live store are skipped: dangling references are
            // tolerated, not repaired.
        }
    }
}
