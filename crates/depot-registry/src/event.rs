//! Registry change events
//!
//! Every successful registry mutation emits a [`StoreEvent`] synchronously to
//! an injected [`StoreEventDispatcher`]. The registry assumes nothing about
//! observers: embedding contexts use [`NoOpDispatcher`], servers register
//! reactive maintenance (implied-repository upkeep, discovery-group upkeep)
//! against a [`MulticastDispatcher`].

use depot_model::ArtifactStore;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// What happened to the affected stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEventType {
    /// Stores were created
    Add,
    /// Stores were replaced
    Update,
    /// Stores were removed
    Delete,
}

/// A registry change notification
///
/// `stores` is ordered: for single-key mutations it holds the one affected
/// store; for `clear` it holds every removed store sorted by key.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Mutation type
    pub event_type: StoreEventType,
    /// Affected stores, in order
    pub stores: Vec<ArtifactStore>,
}

impl StoreEvent {
    /// Create an event for a single affected store
    #[inline]
    #[must_use]
    pub fn single(event_type: StoreEventType, store: ArtifactStore) -> Self {
        Self {
            event_type,
            stores: vec![store],
        }
    }
}

/// Receiver for registry change events
///
/// Dispatch is synchronous and happens after the mutation is visible in the
/// registry; implementations must not block for long and must not panic.
pub trait StoreEventDispatcher: Debug + Send + Sync {
    /// Handle one change event
    fn dispatch(&self, event: &StoreEvent);
}

/// Dispatcher that drops every event
///
/// The default for embedding contexts with no reactive behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDispatcher;

impl StoreEventDispatcher for NoOpDispatcher {
    fn dispatch(&self, _event: &StoreEvent) {}
}

/// Dispatcher that fans events out to registered listeners, in registration
/// order
#[derive(Debug, Default)]
pub struct MulticastDispatcher {
    listeners: RwLock<Vec<Arc<dyn StoreEventDispatcher>>>,
}

impl MulticastDispatcher {
    /// Create an empty dispatcher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it receives every subsequent event
    pub fn register(&self, listener: Arc<dyn StoreEventDispatcher>) {
        self.listeners.write().push(listener);
    }
}

impl StoreEventDispatcher for MulticastDispatcher {
    fn dispatch(&self, event: &StoreEvent) {
        let listeners = self.listeners.read();
        for listener in listeners.iter() {
            listener.dispatch(event);
        }
    }
}
