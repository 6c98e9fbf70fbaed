//! Anchor events and per-provider subscription tables.
//!
//! This module contains:
//! - `AnchorEvent`: the signals a provider emits
//! - `EventHandler` trait: for receiving them
//! - `ProviderEvents`: the subscription table each provider owns
//! - `aggregator`: fan-in of provider events into one outward stream

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::anchor::{AnchorId, AnchorTarget};

pub mod aggregator;

pub use aggregator::{AnchorEventReceiver, EventAggregator, EventFilter, RelayedEvent};

// ============================================================================
// Events
// ============================================================================

/// Signal raised by a provider, usually after an accepted request completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorEvent {
    /// Provider session is initialised and may be started.
    SessionInitialised,
    /// Provider session started tracking.
    SessionStarted,
    /// Provider session ended; also closes a search.
    SessionEnded,
    /// Provider began creating an anchor.
    CreateAnchorStarted,
    /// An anchor was removed from the backend.
    AnchorDeleted { id: AnchorId },
    /// Creation of the anchor failed.
    CreateAnchorFailed,
    /// Creation of the anchor succeeded.
    CreateAnchorSucceeded { id: AnchorId, target: AnchorTarget },
    /// Progress text while the backend localises an anchor.
    StatusMessage { message: String },
    /// General backend failure.
    Error { message: String },
    /// Provider performed an operation on an anchored object.
    AnchorUpdated { id: AnchorId, target: AnchorTarget },
    /// A search found and cached an anchor. Raised once per anchor found.
    AnchorLocated { id: AnchorId },
}

impl AnchorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SessionInitialised => EventKind::SessionInitialised,
            Self::SessionStarted => EventKind::SessionStarted,
            Self::SessionEnded => EventKind::SessionEnded,
            Self::CreateAnchorStarted => EventKind::CreateAnchorStarted,
            Self::AnchorDeleted { .. } => EventKind::AnchorDeleted,
            Self::CreateAnchorFailed => EventKind::CreateAnchorFailed,
            Self::CreateAnchorSucceeded { .. } => EventKind::CreateAnchorSucceeded,
            Self::StatusMessage { .. } => EventKind::StatusMessage,
            Self::Error { .. } => EventKind::Error,
            Self::AnchorUpdated { .. } => EventKind::AnchorUpdated,
            Self::AnchorLocated { .. } => EventKind::AnchorLocated,
        }
    }
}

/// Discriminant of `AnchorEvent`, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionInitialised,
    SessionStarted,
    SessionEnded,
    CreateAnchorStarted,
    AnchorDeleted,
    CreateAnchorFailed,
    CreateAnchorSucceeded,
    StatusMessage,
    Error,
    AnchorUpdated,
    AnchorLocated,
}

impl EventKind {
    /// Events every registered provider has forwarded to facade subscribers.
    pub const SERVICE: [EventKind; 6] = [
        EventKind::CreateAnchorFailed,
        EventKind::CreateAnchorSucceeded,
        EventKind::StatusMessage,
        EventKind::Error,
        EventKind::AnchorUpdated,
        EventKind::AnchorLocated,
    ];

    /// Provider-internal session events, forwarded only when configured.
    pub const LIFECYCLE: [EventKind; 5] = [
        EventKind::SessionInitialised,
        EventKind::SessionStarted,
        EventKind::SessionEnded,
        EventKind::CreateAnchorStarted,
        EventKind::AnchorDeleted,
    ];

    pub fn is_service(&self) -> bool {
        Self::SERVICE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionInitialised => "session_initialised",
            Self::SessionStarted => "session_started",
            Self::SessionEnded => "session_ended",
            Self::CreateAnchorStarted => "create_anchor_started",
            Self::AnchorDeleted => "anchor_deleted",
            Self::CreateAnchorFailed => "create_anchor_failed",
            Self::CreateAnchorSucceeded => "create_anchor_succeeded",
            Self::StatusMessage => "status_message",
            Self::Error => "error",
            Self::AnchorUpdated => "anchor_updated",
            Self::AnchorLocated => "anchor_located",
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Errors a subscribed handler may report back to the emitter.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Handler '{name}' failed: {message}")]
    HandlerFailed { name: String, message: String },
}

/// Handler for events raised by a provider.
pub trait EventHandler: Send + Sync {
    /// Process one event.
    fn handle(&self, event: Arc<AnchorEvent>) -> BoxFuture<'static, Result<(), EventError>>;
}

/// Token returned by `ProviderEvents::subscribe`, used to release the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
}

/// Subscription table owned by a provider.
///
/// Providers call `emit` from whatever task completes their work. Emission
/// holds the table's read lock for the whole delivery, so `unsubscribe`
/// returns only after in-flight deliveries to the released handler finish.
/// A handler must not subscribe or unsubscribe on the table delivering to it.
#[derive(Default)]
pub struct ProviderEvents {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ProviderEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to one kind of event.
    pub async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().await.push(Subscriber { id, kind, handler });
        id
    }

    /// Release a subscription. Returns false if it was already released.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver an event to every handler subscribed to its kind, in
    /// subscription order.
    ///
    /// Returns the number of handlers that accepted the event. Handler
    /// failures are logged and do not stop delivery to later handlers.
    pub async fn emit(&self, event: AnchorEvent) -> usize {
        let kind = event.kind();
        let event = Arc::new(event);
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;

        for subscriber in subscribers.iter().filter(|s| s.kind == kind) {
            match subscriber.handler.handle(Arc::clone(&event)).await {
                Ok(()) => delivered += 1,
                Err(e) => error!(event = kind.as_str(), error = %e, "Event handler failed"),
            }
        }

        debug!(event = kind.as_str(), delivered, "Provider event emitted");
        delivered
    }

    /// Number of live subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
