//! Anchor system facade.
//!
//! The provider-agnostic entry point: callers register providers, issue
//! anchor requests, and subscribe to the events every registered provider
//! raises, without knowing which backend services a request.
//!
//! # Example
//!
//! ```ignore
//! use anchor_hub::{AnchorSystem, Config, EventFilter, ProviderHandle};
//!
//! let system = AnchorSystem::builder(Config::load(None)?)
//!     .with_provider(ProviderHandle::new(DeviceProvider::new()))
//!     .with_provider(ProviderHandle::new(CloudProvider::new()))
//!     .build()
//!     .await;
//!
//! let mut events = system.subscribe(EventFilter::All).await;
//! system.start_providers().await;
//!
//! let request = CreateAnchorRequest::expiring_in("chair", pose, Duration::hours(1));
//! let id = system.create_anchor(request).await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{} from {}", event.kind().as_str(), event.provider);
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::anchor::{AnchorId, AnchorSearch, AnchorTarget};
use crate::config::Config;
use crate::dispatch::{self, DispatchMediator};
use crate::events::{AnchorEventReceiver, EventAggregator, EventFilter};
use crate::provider::{ProviderHandle, ProviderInfo};
use crate::registry::ProviderRegistry;
use crate::request::{self, CreateAnchorRequest, MoveAnchorRequest};

/// Builder for an anchor system with providers pre-registered.
pub struct AnchorSystemBuilder {
    config: Config,
    providers: Vec<ProviderHandle>,
}

impl AnchorSystemBuilder {
    /// Create a new builder with given config.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            providers: Vec::new(),
        }
    }

    /// Add a provider. Providers are registered in the order added.
    pub fn with_provider(mut self, handle: ProviderHandle) -> Self {
        self.providers.push(handle);
        self
    }

    /// Build the system and register every provider.
    pub async fn build(self) -> AnchorSystem {
        let system = AnchorSystem::new(self.config);
        for handle in self.providers {
            system.register(handle).await;
        }
        system
    }
}

/// Provider-agnostic anchor facade.
///
/// Holds no anchor state. Requests pass through to the dispatch mediator;
/// provider events are relayed to subscribers.
pub struct AnchorSystem {
    registry: Arc<ProviderRegistry>,
    aggregator: Arc<EventAggregator>,
    mediator: DispatchMediator,
}

impl AnchorSystem {
    pub fn new(config: Config) -> Self {
        let aggregator = Arc::new(EventAggregator::new(config.events.forward_lifecycle_events));
        let registry = Arc::new(ProviderRegistry::new(Arc::clone(&aggregator)));
        let mediator = DispatchMediator::new(Arc::clone(&registry), config.dispatch);

        Self {
            registry,
            aggregator,
            mediator,
        }
    }

    /// Create a new builder with given config.
    pub fn builder(config: Config) -> AnchorSystemBuilder {
        AnchorSystemBuilder::new(config)
    }

    // --- Registry ---

    /// Register a provider at the end of dispatch order.
    ///
    /// Returns false if the handle is already registered.
    pub async fn register(&self, handle: ProviderHandle) -> bool {
        self.registry.register(handle).await
    }

    /// Unregister a provider. No event it raises afterwards is relayed.
    ///
    /// Returns false if the handle is not registered.
    pub async fn unregister(&self, handle: &ProviderHandle) -> bool {
        self.registry.unregister(handle).await
    }

    /// Registered providers in dispatch order.
    pub async fn active_providers(&self) -> Vec<ProviderInfo> {
        self.registry.active_providers().await
    }

    pub async fn provider_count(&self) -> usize {
        self.registry.len().await
    }

    // --- Events ---

    /// Subscribe to events relayed from every registered provider.
    ///
    /// Only events raised after this call are received.
    pub async fn subscribe(&self, filter: EventFilter) -> AnchorEventReceiver {
        self.aggregator.subscribe(filter).await
    }

    // --- Anchor operations ---

    /// Ask providers, in order, to create an anchor.
    ///
    /// Returns the identity minted by the first provider that accepts, or
    /// `None` if none did.
    pub async fn create_anchor(
        &self,
        request: CreateAnchorRequest,
    ) -> request::Result<Option<AnchorId>> {
        self.mediator.create_anchor(request).await
    }

    pub async fn find_anchor(&self, id: &AnchorId) -> request::Result<bool> {
        self.mediator.find_anchor(id).await
    }

    pub async fn find_anchors(&self, ids: &[AnchorId]) -> request::Result<bool> {
        self.mediator.find_anchors(ids).await
    }

    pub async fn find_anchors_by_search(&self, search: AnchorSearch) -> bool {
        self.mediator.find_anchors_by_search(search).await
    }

    pub async fn place_anchor(&self, id: &AnchorId, target: &AnchorTarget) -> request::Result<bool> {
        self.mediator.place_anchor(id, target).await
    }

    pub async fn move_anchor(&self, request: MoveAnchorRequest) -> request::Result<bool> {
        self.mediator.move_anchor(request).await
    }

    pub async fn delete_anchor(&self, id: &AnchorId) -> request::Result<bool> {
        self.mediator.delete_anchor(id).await
    }

    pub async fn delete_anchors(&self, ids: &[AnchorId]) -> request::Result<bool> {
        self.mediator.delete_anchors(ids).await
    }

    /// Clear every provider's cache. True if any provider cleared.
    pub async fn clear_cache(&self) -> bool {
        self.mediator.clear_cache().await
    }

    // --- Lifecycle ---

    pub async fn start_providers(&self) -> usize {
        self.mediator.start_providers().await
    }

    pub async fn stop_providers(&self) -> usize {
        self.mediator.stop_providers().await
    }

    /// Unregister every provider, then stop each one.
    ///
    /// Returns how many providers stopped cleanly.
    pub async fn shutdown(&self) -> usize {
        let removed = self.registry.clear().await;
        let stopped = dispatch::stop_all(&removed).await;
        info!(providers = removed.len(), stopped, "Anchor system shut down");
        stopped
    }
}

impl Default for AnchorSystem {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
