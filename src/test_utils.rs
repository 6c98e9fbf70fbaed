//! Test utilities shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::events::{AnchorEvent, EventError, EventHandler};
use crate::provider::mock::MockAnchorProvider;
use crate::provider::ProviderHandle;

/// Handler that counts and records every event it receives.
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
    seen: Arc<RwLock<Vec<AnchorEvent>>>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }

    pub fn received(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub async fn seen(&self) -> Vec<AnchorEvent> {
        self.seen.read().await.clone()
    }
}

impl EventHandler for CountingHandler {
    fn handle(&self, event: Arc<AnchorEvent>) -> BoxFuture<'static, Result<(), EventError>> {
        let count = Arc::clone(&self.count);
        let seen = Arc::clone(&self.seen);
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
            seen.write().await.push((*event).clone());
            Ok(())
        })
    }
}

/// Handler that always fails.
pub struct FailingHandler;

impl EventHandler for FailingHandler {
    fn handle(&self, _event: Arc<AnchorEvent>) -> BoxFuture<'static, Result<(), EventError>> {
        Box::pin(async {
            Err(EventError::HandlerFailed {
                name: "failing".to_string(),
                message: "test failure".to_string(),
            })
        })
    }
}

/// Build a mock provider and a handle wrapping the same instance.
pub fn mock_handle(name: &str, accepts: bool) -> (Arc<MockAnchorProvider>, ProviderHandle) {
    let provider = Arc::new(MockAnchorProvider::new(name).with_accepts(accepts));
    let handle = ProviderHandle::from_arc(provider.clone());
    (provider, handle)
}
