//! Testing utilities for the depot workspace
//!
//! Store fixtures, a recording event dispatcher, and an in-memory
//! [`ContentTransport`] that simulates local cache plus remote upstream
//! content, with request logging for asserting resolution order.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use depot_content::{
    ConcreteResource, ContentStream, ContentTransport, Location, Transfer, TransportError,
};
use depot_model::{ArtifactStore, StoreKey};
use depot_registry::{StoreEvent, StoreEventDispatcher};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tokio::io::AsyncReadExt;

/// Hosted fixture: releases allowed, snapshots rejected, writable.
pub fn hosted(name: &str) -> ArtifactStore {
    ArtifactStore::hosted("maven", name)
}

/// Hosted fixture with explicit write policy.
pub fn hosted_with(
    name: &str,
    allow_releases: bool,
    allow_snapshots: bool,
    readonly: bool,
) -> ArtifactStore {
    let mut store = ArtifactStore::hosted("maven", name);
    {
        let cfg = store.as_hosted_mut().expect("hosted fixture");
        cfg.allow_releases = allow_releases;
        cfg.allow_snapshots = allow_snapshots;
        cfg.readonly = readonly;
    }
    store
}

/// Remote fixture with a synthetic upstream URL.
pub fn remote(name: &str) -> ArtifactStore {
    ArtifactStore::remote("maven", name, &format!("https://{name}.example.org/"))
}

/// Group fixture over the given members, in order.
pub fn group(name: &str, members: &[&ArtifactStore]) -> ArtifactStore {
    ArtifactStore::group(
        "maven",
        name,
        members.iter().map(|m| m.key().clone()).collect(),
    )
}

/// Wrap bytes as an upload stream.
pub fn stream(bytes: &[u8]) -> ContentStream {
    Box::new(std::io::Cursor::new(bytes.to_vec()))
}

/// Dispatcher that records every event for later assertion.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().clone()
    }
}

impl StoreEventDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: &StoreEvent) {
        self.events.lock().push(event.clone());
    }
}

/// In-memory content transport.
///
/// Two layers of content: a local cache (hosted content and cached remote
/// content) and a simulated upstream (reachable only through repository
/// locations; retrieval populates the cache, deletion does not touch it).
/// Stores marked failing error on every operation, and every retrieval is
/// logged so tests can assert short-circuiting and ordering.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    cache: DashMap<(StoreKey, String), Vec<u8>>,
    upstream: DashMap<(StoreKey, String), Vec<u8>>,
    failing: DashSet<StoreKey>,
    requests: Mutex<Vec<(StoreKey, String)>>,
    refreshed: Mutex<Vec<(StoreKey, String)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place content directly in the local cache.
    pub fn seed(&self, key: &StoreKey, path: &str, content: &[u8]) {
        self.cache
            .insert((key.clone(), path.to_string()), content.to_vec());
    }

    /// Place content in the simulated upstream of a remote store.
    pub fn seed_upstream(&self, key: &StoreKey, path: &str, content: &[u8]) {
        self.upstream
            .insert((key.clone(), path.to_string()), content.to_vec());
    }

    /// Make every operation against the store fail.
    pub fn fail_store(&self, key: &StoreKey) {
        self.failing.insert(key.clone());
    }

    /// True when the local cache holds content at the path.
    pub fn cached(&self, key: &StoreKey, path: &str) -> bool {
        self.cache.contains_key(&(key.clone(), path.to_string()))
    }

    /// Cached bytes at the path, if any.
    pub fn cached_content(&self, key: &StoreKey, path: &str) -> Option<Vec<u8>> {
        self.cache
            .get(&(key.clone(), path.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Ordered log of every retrieval/existence request.
    pub fn requests(&self) -> Vec<(StoreKey, String)> {
        self.requests.lock().clone()
    }

    /// Ordered log of refreshed file paths.
    pub fn refreshed(&self) -> Vec<(StoreKey, String)> {
        self.refreshed.lock().clone()
    }

    fn check_failing(&self, resource: &ConcreteResource) -> Result<(), TransportError> {
        if self.failing.contains(resource.key()) {
            return Err(TransportError::new(
                resource.key().clone(),
                resource.path.clone(),
                "simulated transport failure",
            ));
        }
        Ok(())
    }

    fn lookup(&self, resource: &ConcreteResource) -> Option<Vec<u8>> {
        let entry = (resource.key().clone(), resource.path.clone());
        if let Some(content) = self.cache.get(&entry) {
            return Some(content.value().clone());
        }
        // Upstream content is reachable only through a networked location.
        if matches!(resource.location, Location::Repository(_)) {
            return self.upstream.get(&entry).map(|c| c.value().clone());
        }
        None
    }

    fn list_names(&self, resource: &ConcreteResource) -> Vec<String> {
        let prefix = resource.path.trim_matches('/').to_string();
        let mut names = BTreeSet::new();

        let mut scan = |entries: &DashMap<(StoreKey, String), Vec<u8>>| {
            for entry in entries.iter() {
                let (key, path) = entry.key();
                if key != resource.key() {
                    continue;
                }
                let rest = if prefix.is_empty() {
                    path.as_str()
                } else if let Some(rest) = path.strip_prefix(&format!("{prefix}/")) {
                    rest
                } else {
                    continue;
                };
                if rest.is_empty() {
                    continue;
                }
                match rest.split_once('/') {
                    Some((dir, _)) => names.insert(format!("{dir}/")),
                    None => names.insert(rest.to_string()),
                };
            }
        };

        scan(&self.cache);
        if matches!(resource.location, Location::Repository(_)) {
            scan(&self.upstream);
        }
        names.into_iter().collect()
    }
}

#[async_trait]
impl ContentTransport for MemoryTransport {
    async fn exists(&self, resource: &ConcreteResource) -> Result<bool, TransportError> {
        self.requests
            .lock()
            .push((resource.key().clone(), resource.path.clone()));
        self.check_failing(resource)?;
        Ok(self.lookup(resource).is_some())
    }

    async fn retrieve(
        &self,
        resource: &ConcreteResource,
    ) -> Result<Option<Transfer>, TransportError> {
        self.requests
            .lock()
            .push((resource.key().clone(), resource.path.clone()));
        self.check_failing(resource)?;

        match self.lookup(resource) {
            Some(content) => {
                // A networked fetch populates the local cache.
                self.cache.insert(
                    (resource.key().clone(), resource.path.clone()),
                    content,
                );
                Ok(Some(self.cache_reference(resource)))
            }
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        resource: &ConcreteResource,
        mut content: ContentStream,
    ) -> Result<Transfer, TransportError> {
        self.check_failing(resource)?;
        let mut buffer = Vec::new();
        content.read_to_end(&mut buffer).await.map_err(|err| {
            TransportError::new(
                resource.key().clone(),
                resource.path.clone(),
                err.to_string(),
            )
        })?;
        self.cache
            .insert((resource.key().clone(), resource.path.clone()), buffer);
        Ok(self.cache_reference(resource))
    }

    async fn delete(&self, resource: &ConcreteResource) -> Result<bool, TransportError> {
        self.check_failing(resource)?;
        Ok(self
            .cache
            .remove(&(resource.key().clone(), resource.path.clone()))
            .is_some())
    }

    async fn list_dir(&self, resource: &ConcreteResource) -> Result<Vec<String>, TransportError> {
        self.check_failing(resource)?;
        Ok(self.list_names(resource))
    }

    async fn open(&self, transfer: &Transfer) -> Result<Vec<u8>, TransportError> {
        let entry = (transfer.key.clone(), transfer.path.clone());
        self.cache
            .get(&entry)
            .map(|c| c.value().clone())
            .or_else(|| self.upstream.get(&entry).map(|c| c.value().clone()))
            .ok_or_else(|| {
                TransportError::new(
                    transfer.key.clone(),
                    transfer.path.clone(),
                    "no content behind transfer",
                )
            })
    }

    async fn refresh(&self, resource: &ConcreteResource) -> Result<(), TransportError> {
        self.check_failing(resource)?;
        self.refreshed
            .lock()
            .push((resource.key().clone(), resource.path.clone()));
        Ok(())
    }
}
