//! Mock anchor provider for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnchorProvider, ProviderError, ProviderKind, Result};
use crate::anchor::{AnchorId, AnchorSearch, AnchorTarget};
use crate::events::{AnchorEvent, ProviderEvents};
use crate::request::{AnchorMove, AnchorPlacement};

/// Call log shared between mocks to assert cross-provider ordering.
///
/// Entries read `"<provider>:<operation>"`.
pub type CallLog = Arc<RwLock<Vec<String>>>;

/// Scriptable in-memory provider.
///
/// Accepts or declines every request according to a single switch, records
/// each call, and emits only the events a test pushes through `emit`.
pub struct MockAnchorProvider {
    name: String,
    kind: ProviderKind,
    accepts: AtomicBool,
    running: AtomicBool,
    fail_start: AtomicBool,
    events: ProviderEvents,
    calls: RwLock<Vec<&'static str>>,
    shared_log: Option<CallLog>,
}

impl MockAnchorProvider {
    /// Create a provider that accepts every request.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::Local,
            accepts: AtomicBool::new(true),
            running: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            events: ProviderEvents::new(),
            calls: RwLock::new(Vec::new()),
            shared_log: None,
        }
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_accepts(self, accepts: bool) -> Self {
        self.accepts.store(accepts, Ordering::SeqCst);
        self
    }

    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.shared_log = Some(log);
        self
    }

    /// Make `start` fail.
    pub fn with_failing_start(self) -> Self {
        self.fail_start.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_accepts(&self, accepts: bool) {
        self.accepts.store(accepts, Ordering::SeqCst);
    }

    /// Raise an event as if a backend operation completed.
    pub async fn emit(&self, event: AnchorEvent) -> usize {
        self.events.emit(event).await
    }

    /// Operations invoked on this provider, in order.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn record(&self, operation: &'static str) -> bool {
        self.calls.write().await.push(operation);
        if let Some(log) = &self.shared_log {
            log.write().await.push(format!("{}:{}", self.name, operation));
        }
        self.accepts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnchorProvider for MockAnchorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind.clone()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn events(&self) -> &ProviderEvents {
        &self.events
    }

    async fn start(&self) -> Result<()> {
        self.record("start").await;
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ProviderError::StartFailed {
                name: self.name.clone(),
                message: "Mock start failure".to_string(),
            });
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop").await;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn create_anchor(&self, _placement: &AnchorPlacement) -> Option<AnchorId> {
        if self.record("create_anchor").await {
            Some(AnchorId::from(Uuid::new_v4()))
        } else {
            None
        }
    }

    async fn find_anchor(&self, _id: &AnchorId) -> bool {
        self.record("find_anchor").await
    }

    async fn find_anchors(&self, _ids: &[AnchorId]) -> bool {
        self.record("find_anchors").await
    }

    async fn find_anchors_by_search(&self, _search: AnchorSearch) -> bool {
        self.record("find_anchors_by_search").await
    }

    async fn place_anchor(&self, _id: &AnchorId, _target: &AnchorTarget) -> bool {
        self.record("place_anchor").await
    }

    async fn move_anchor(&self, _request: &AnchorMove) -> bool {
        self.record("move_anchor").await
    }

    async fn delete_anchor(&self, _id: &AnchorId) -> bool {
        self.record("delete_anchor").await
    }

    async fn delete_anchors(&self, _ids: &[AnchorId]) -> bool {
        self.record("delete_anchors").await
    }

    async fn clear_cache(&self) -> bool {
        self.record("clear_cache").await
    }
}
