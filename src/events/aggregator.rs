//! Fan-in of provider events into the facade's outward stream.
//!
//! Each registered provider gets one forwarding subscription per forwarded
//! event kind. Forwarders push into every open subscriber's queue; facade
//! subscribers receive every active provider's events without knowing which
//! provider raised them.
//!
//! Subscriber queues are unbounded. Every forwarded event reaches every
//! matching subscriber exactly once, in emission order, however far behind
//! the subscriber is.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::{AnchorEvent, EventError, EventHandler, EventKind, SubscriptionId};
use crate::provider::{ProviderHandle, ProviderId};

/// Event as seen by facade subscribers.
#[derive(Debug, Clone)]
pub struct RelayedEvent {
    /// Provider that raised the event.
    pub provider: ProviderId,
    pub event: Arc<AnchorEvent>,
}

impl RelayedEvent {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Selects which event kinds a subscriber receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// Every forwarded event.
    #[default]
    All,
    /// Only the listed kinds.
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    /// Filter for a single event kind.
    pub fn only(kind: EventKind) -> Self {
        Self::Kinds(vec![kind])
    }

    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Self::All => true,
            Self::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

/// Receiving end of the outward event stream.
pub struct AnchorEventReceiver {
    receiver: mpsc::UnboundedReceiver<Arc<RelayedEvent>>,
}

impl AnchorEventReceiver {
    /// Wait for the next event matching this receiver's filter.
    ///
    /// Returns `None` once the aggregator is dropped and every provider
    /// has been unwired.
    pub async fn recv(&mut self) -> Option<Arc<RelayedEvent>> {
        self.receiver.recv().await
    }

    /// Take the next already-delivered event, if any.
    pub fn try_recv(&mut self) -> Option<Arc<RelayedEvent>> {
        self.receiver.try_recv().ok()
    }

    /// Drain every already-delivered event.
    pub fn drain(&mut self) -> Vec<Arc<RelayedEvent>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// One subscriber's queue and the kinds it asked for.
struct Outlet {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<Arc<RelayedEvent>>,
}

type Outlets = Arc<RwLock<Vec<Outlet>>>;

/// Forwards one provider's events to every open outlet.
struct Forwarder {
    provider: ProviderId,
    outlets: Outlets,
}

impl EventHandler for Forwarder {
    fn handle(&self, event: Arc<AnchorEvent>) -> BoxFuture<'static, Result<(), EventError>> {
        let provider = self.provider;
        let outlets = Arc::clone(&self.outlets);

        Box::pin(async move {
            let kind = event.kind();
            let relayed = Arc::new(RelayedEvent { provider, event });

            let mut outlets = outlets.write().await;
            let before = outlets.len();
            let mut receivers = 0;

            // A failed send means the receiver was dropped
            outlets.retain(|outlet| {
                if !outlet.filter.matches(kind) {
                    return !outlet.sender.is_closed();
                }
                match outlet.sender.send(Arc::clone(&relayed)) {
                    Ok(()) => {
                        receivers += 1;
                        true
                    }
                    Err(_) => false,
                }
            });

            if outlets.len() != before {
                debug!(released = before - outlets.len(), "Dropped closed anchor event receivers");
            }
            debug!(provider.id = %provider, event = kind.as_str(), receivers, "Forwarded anchor event");
            Ok(())
        })
    }
}

/// Wires provider subscription tables to the outward stream.
pub struct EventAggregator {
    outlets: Outlets,
    forwarded: Vec<EventKind>,
}

impl EventAggregator {
    /// Create an aggregator forwarding the six service events, plus the
    /// provider lifecycle events when `forward_lifecycle` is set.
    pub fn new(forward_lifecycle: bool) -> Self {
        let mut forwarded = EventKind::SERVICE.to_vec();
        if forward_lifecycle {
            forwarded.extend(EventKind::LIFECYCLE);
        }

        info!(forward_lifecycle, "Anchor event aggregator initialized");

        Self {
            outlets: Arc::new(RwLock::new(Vec::new())),
            forwarded,
        }
    }

    /// Event kinds wired for each registered provider.
    pub fn forwarded_kinds(&self) -> &[EventKind] {
        &self.forwarded
    }

    /// Subscribe the outward stream to every forwarded event of `handle`.
    ///
    /// Returns the tokens to hand back to `unwire`.
    pub async fn wire(&self, handle: &ProviderHandle) -> Vec<SubscriptionId> {
        let forwarder: Arc<dyn EventHandler> = Arc::new(Forwarder {
            provider: handle.id(),
            outlets: Arc::clone(&self.outlets),
        });

        let events = handle.provider().events();
        let mut subscriptions = Vec::with_capacity(self.forwarded.len());
        for kind in &self.forwarded {
            subscriptions.push(events.subscribe(*kind, Arc::clone(&forwarder)).await);
        }

        debug!(
            provider.name = %handle.name(),
            subscriptions = subscriptions.len(),
            "Provider events wired"
        );

        subscriptions
    }

    /// Release exactly the subscriptions `wire` created.
    ///
    /// Completes only after in-flight deliveries from `handle` finish, so no
    /// event from it reaches subscribers afterwards. Returns the number of
    /// subscriptions released.
    pub async fn unwire(&self, handle: &ProviderHandle, subscriptions: &[SubscriptionId]) -> usize {
        let events = handle.provider().events();
        let mut released = 0;
        for id in subscriptions {
            if events.unsubscribe(*id).await {
                released += 1;
            }
        }

        if released != subscriptions.len() {
            warn!(
                provider.name = %handle.name(),
                expected = subscriptions.len(),
                released,
                "Provider subscriptions were released elsewhere"
            );
        }

        debug!(provider.name = %handle.name(), released, "Provider events unwired");
        released
    }

    /// Open a new receiver on the outward stream.
    ///
    /// Only events forwarded after this call are observed.
    pub async fn subscribe(&self, filter: EventFilter) -> AnchorEventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.outlets.write().await.push(Outlet { filter, sender });
        AnchorEventReceiver { receiver }
    }

    /// Number of open receivers.
    pub async fn receiver_count(&self) -> usize {
        let mut outlets = self.outlets.write().await;
        outlets.retain(|outlet| !outlet.sender.is_closed());
        outlets.len()
    }
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new(false)
    }
}
