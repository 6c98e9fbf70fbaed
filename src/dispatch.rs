//! Dispatch of facade operations to registered providers.
//!
//! Two policies:
//! - first-success: try providers in registration order, stop at the first
//!   that accepts (find, search, place, move, delete, create)
//! - broadcast: invoke every provider, succeed if any accepted (clear cache)
//!
//! Start and stop run every provider in registration order and report how
//! many succeeded.
//!
//! Preconditions are checked before any provider is invoked. An empty
//! registry, or every provider declining, is a plain `false`/`None`.

use std::sync::Arc;

use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use tracing::{debug, warn};

use crate::anchor::{AnchorId, AnchorSearch, AnchorTarget};
use crate::config::DispatchConfig;
use crate::provider::ProviderHandle;
use crate::registry::ProviderRegistry;
use crate::request::{self, CreateAnchorRequest, MoveAnchorRequest, RequestError};

/// Invoke providers in order until one returns `Some`.
pub async fn first_some<'a, T, F>(
    providers: &'a [ProviderHandle],
    operation: &'static str,
    mut invoke: F,
) -> Option<T>
where
    F: FnMut(&'a ProviderHandle) -> BoxFuture<'a, Option<T>>,
{
    for handle in providers {
        match invoke(handle).await {
            Some(value) => {
                debug!(operation, provider.name = %handle.name(), "Provider accepted request");
                return Some(value);
            }
            None => {
                debug!(operation, provider.name = %handle.name(), "Provider declined request");
            }
        }
    }

    debug!(operation, providers = providers.len(), "No provider accepted request");
    None
}

/// Invoke providers in order until one returns `true`.
pub async fn first_success<'a, F>(
    providers: &'a [ProviderHandle],
    operation: &'static str,
    mut invoke: F,
) -> bool
where
    F: FnMut(&'a ProviderHandle) -> BoxFuture<'a, bool>,
{
    for handle in providers {
        if invoke(handle).await {
            debug!(operation, provider.name = %handle.name(), "Provider accepted request");
            return true;
        }
        debug!(operation, provider.name = %handle.name(), "Provider declined request");
    }

    debug!(operation, providers = providers.len(), "No provider accepted request");
    false
}

/// Invoke every provider and OR the outcomes.
///
/// Providers run concurrently when `parallel` is set, otherwise in
/// registration order. Every provider is invoked regardless of earlier
/// outcomes.
pub async fn broadcast<'a, F>(
    providers: &'a [ProviderHandle],
    operation: &'static str,
    parallel: bool,
    mut invoke: F,
) -> bool
where
    F: FnMut(&'a ProviderHandle) -> BoxFuture<'a, bool>,
{
    let outcomes: Vec<bool> = if parallel {
        join_all(providers.iter().map(|handle| invoke(handle))).await
    } else {
        let mut outcomes = Vec::with_capacity(providers.len());
        for handle in providers {
            outcomes.push(invoke(handle).await);
        }
        outcomes
    };

    for (handle, accepted) in providers.iter().zip(&outcomes) {
        debug!(operation, provider.name = %handle.name(), accepted = *accepted, "Broadcast outcome");
    }

    outcomes.into_iter().any(|accepted| accepted)
}

/// Implements each facade operation over the registry.
pub struct DispatchMediator {
    registry: Arc<ProviderRegistry>,
    config: DispatchConfig,
}

impl DispatchMediator {
    pub fn new(registry: Arc<ProviderRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    #[tracing::instrument(name = "anchor.create", skip_all)]
    pub async fn create_anchor(
        &self,
        request: CreateAnchorRequest,
    ) -> request::Result<Option<AnchorId>> {
        let placement = request.validate(Utc::now(), self.config.max_time_to_live_secs)?;
        let providers = self.registry.snapshot().await;

        let created = first_some(&providers, "create_anchor", |handle| {
            handle.provider().create_anchor(&placement)
        })
        .await;

        if let Some(id) = &created {
            debug!(anchor_id = %id, target = %placement.target, "Anchor creation accepted");
        }
        Ok(created)
    }

    #[tracing::instrument(name = "anchor.find", skip_all, fields(anchor_id = %id))]
    pub async fn find_anchor(&self, id: &AnchorId) -> request::Result<bool> {
        request::require_id(id)?;
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "find_anchor", |handle| handle.provider().find_anchor(id)).await)
    }

    #[tracing::instrument(name = "anchor.find_many", skip_all, fields(count = ids.len()))]
    pub async fn find_anchors(&self, ids: &[AnchorId]) -> request::Result<bool> {
        let ids = request::non_blank_ids(ids)?;
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "find_anchors", |handle| handle.provider().find_anchors(&ids)).await)
    }

    #[tracing::instrument(name = "anchor.search", skip_all, fields(search = search.as_str()))]
    pub async fn find_anchors_by_search(&self, search: AnchorSearch) -> bool {
        let providers = self.registry.snapshot().await;

        first_success(&providers, "find_anchors_by_search", |handle| {
            handle.provider().find_anchors_by_search(search)
        })
        .await
    }

    #[tracing::instrument(name = "anchor.place", skip_all, fields(anchor_id = %id))]
    pub async fn place_anchor(&self, id: &AnchorId, target: &AnchorTarget) -> request::Result<bool> {
        request::require_id(id)?;
        if target.is_blank() {
            return Err(RequestError::MissingTarget);
        }
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "place_anchor", |handle| {
            handle.provider().place_anchor(id, target)
        })
        .await)
    }

    #[tracing::instrument(name = "anchor.move", skip_all)]
    pub async fn move_anchor(&self, request: MoveAnchorRequest) -> request::Result<bool> {
        let request = request.validate()?;
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "move_anchor", |handle| handle.provider().move_anchor(&request)).await)
    }

    #[tracing::instrument(name = "anchor.delete", skip_all, fields(anchor_id = %id))]
    pub async fn delete_anchor(&self, id: &AnchorId) -> request::Result<bool> {
        request::require_id(id)?;
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "delete_anchor", |handle| handle.provider().delete_anchor(id)).await)
    }

    #[tracing::instrument(name = "anchor.delete_many", skip_all, fields(count = ids.len()))]
    pub async fn delete_anchors(&self, ids: &[AnchorId]) -> request::Result<bool> {
        let ids = request::non_blank_ids(ids)?;
        let providers = self.registry.snapshot().await;

        Ok(first_success(&providers, "delete_anchors", |handle| {
            handle.provider().delete_anchors(&ids)
        })
        .await)
    }

    #[tracing::instrument(name = "anchor.clear_cache", skip_all)]
    pub async fn clear_cache(&self) -> bool {
        let providers = self.registry.snapshot().await;

        broadcast(&providers, "clear_cache", self.config.parallel_broadcast, |handle| {
            handle.provider().clear_cache()
        })
        .await
    }

    /// Start every registered provider. Returns how many started.
    pub async fn start_providers(&self) -> usize {
        let providers = self.registry.snapshot().await;
        let mut started = 0;

        for handle in &providers {
            match handle.provider().start().await {
                Ok(()) => started += 1,
                Err(e) => warn!(provider.name = %handle.name(), error = %e, "Provider failed to start"),
            }
        }

        debug!(started, providers = providers.len(), "Providers started");
        started
    }

    /// Stop every registered provider. Returns how many stopped.
    pub async fn stop_providers(&self) -> usize {
        let providers = self.registry.snapshot().await;
        stop_all(&providers).await
    }
}

/// Stop each provider in order, logging failures.
pub(crate) async fn stop_all(providers: &[ProviderHandle]) -> usize {
    let mut stopped = 0;

    for handle in providers {
        match handle.provider().stop().await {
            Ok(()) => stopped += 1,
            Err(e) => warn!(provider.name = %handle.name(), error = %e, "Provider failed to stop"),
        }
    }

    debug!(stopped, providers = providers.len(), "Providers stopped");
    stopped
}
