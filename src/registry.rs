//! Provider registry - ordered set of active providers with event wiring.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::events::{EventAggregator, SubscriptionId};
use crate::provider::{ProviderHandle, ProviderId, ProviderInfo};

/// A registered provider and the subscriptions wired for it.
struct Registration {
    handle: ProviderHandle,
    subscriptions: Vec<SubscriptionId>,
}

/// Thread-safe ordered registry of providers.
///
/// Insertion order is dispatch priority. A provider's events are wired to the
/// aggregator exactly while it is registered: wiring and insertion happen
/// under one write lock, as do unwiring and removal.
pub struct ProviderRegistry {
    entries: RwLock<IndexMap<ProviderId, Registration>>,
    aggregator: Arc<EventAggregator>,
}

impl ProviderRegistry {
    pub fn new(aggregator: Arc<EventAggregator>) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            aggregator,
        }
    }

    /// Add a provider at the end of dispatch order and wire its events.
    ///
    /// Returns false, changing nothing, if the handle is already registered.
    pub async fn register(&self, handle: ProviderHandle) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&handle.id()) {
            debug!(provider.name = %handle.name(), "Provider already registered");
            return false;
        }

        let subscriptions = self.aggregator.wire(&handle).await;

        info!(
            provider.name = %handle.name(),
            provider.kind = %handle.kind(),
            position = entries.len(),
            "Registered anchor provider"
        );

        entries.insert(
            handle.id(),
            Registration {
                handle,
                subscriptions,
            },
        );
        true
    }

    /// Unwire and remove a provider.
    ///
    /// Returns false if the handle is not registered. Once this returns, no
    /// further events from the provider reach facade subscribers.
    pub async fn unregister(&self, handle: &ProviderHandle) -> bool {
        let mut entries = self.entries.write().await;
        let Some(registration) = entries.get(&handle.id()) else {
            debug!(provider.name = %handle.name(), "Provider not registered");
            return false;
        };

        self.aggregator
            .unwire(&registration.handle, &registration.subscriptions)
            .await;
        entries.shift_remove(&handle.id());

        info!(provider.name = %handle.name(), "Unregistered anchor provider");
        true
    }

    /// Unwire and remove every provider, returning them in dispatch order.
    pub async fn clear(&self) -> Vec<ProviderHandle> {
        let mut entries = self.entries.write().await;
        let mut removed = Vec::with_capacity(entries.len());

        for (_, registration) in entries.drain(..) {
            self.aggregator
                .unwire(&registration.handle, &registration.subscriptions)
                .await;
            removed.push(registration.handle);
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "Unregistered all anchor providers");
        }
        removed
    }

    /// Snapshot of registered handles in dispatch order.
    pub async fn snapshot(&self) -> Vec<ProviderHandle> {
        let entries = self.entries.read().await;
        entries.values().map(|r| r.handle.clone()).collect()
    }

    /// Diagnostic view of registered providers in dispatch order.
    pub async fn active_providers(&self) -> Vec<ProviderInfo> {
        let entries = self.entries.read().await;
        entries.values().map(|r| r.handle.info()).collect()
    }

    pub async fn contains(&self, handle: &ProviderHandle) -> bool {
        self.entries.read().await.contains_key(&handle.id())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
