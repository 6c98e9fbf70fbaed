//! Anchor provider capability contract.
//!
//! A provider is a backend (device tracking, a cloud anchor service) that
//! services anchor requests and reports outcomes through its `ProviderEvents`
//! table. Boolean results report only whether a request was accepted for
//! processing; completion arrives later as events.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::anchor::{AnchorId, AnchorSearch, AnchorTarget};
use crate::events::ProviderEvents;
use crate::request::{AnchorMove, AnchorPlacement};

pub mod mock;

pub use mock::MockAnchorProvider;

/// Result type for provider lifecycle operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors from starting or stopping a provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider '{name}' failed to start: {message}")]
    StartFailed { name: String, message: String },

    #[error("Provider '{name}' failed to stop: {message}")]
    StopFailed { name: String, message: String },
}

/// Backend family a provider belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// On-device anchors that do not leave the session.
    Local,
    /// Anchors persisted by a cloud service and shareable across devices.
    Cloud,
    /// Anything else, tagged by name.
    Custom(String),
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Cloud => f.write_str("cloud"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Capability surface every anchor backend implements.
///
/// Implementations:
/// - `MockAnchorProvider`: scriptable in-memory provider for tests
#[async_trait]
pub trait AnchorProvider: Send + Sync {
    /// Human-readable name for logs and diagnostics.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn is_running(&self) -> bool;

    /// Subscription table this provider emits its events through.
    fn events(&self) -> &ProviderEvents;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Create an anchor for a validated placement.
    ///
    /// Returns the provider-minted identity, or `None` if the provider
    /// declines the request.
    async fn create_anchor(&self, placement: &AnchorPlacement) -> Option<AnchorId>;

    async fn find_anchor(&self, id: &AnchorId) -> bool;

    async fn find_anchors(&self, ids: &[AnchorId]) -> bool;

    /// Run an area search. Each anchor found is reported as `AnchorLocated`.
    async fn find_anchors_by_search(&self, search: AnchorSearch) -> bool;

    /// Attach `target` to a located anchor. Declines for unknown ids.
    async fn place_anchor(&self, id: &AnchorId, target: &AnchorTarget) -> bool;

    /// Move an anchored target. This replaces the old anchor with a new one.
    async fn move_anchor(&self, request: &AnchorMove) -> bool;

    async fn delete_anchor(&self, id: &AnchorId) -> bool;

    async fn delete_anchors(&self, ids: &[AnchorId]) -> bool;

    /// Clear the provider's local cache of located anchors.
    async fn clear_cache(&self) -> bool;
}

/// Identity of a provider instance.
///
/// Derived from the address of the shared provider value, so every handle
/// over the same `Arc` carries the same id. Stable for as long as any handle
/// keeps the provider alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(usize);

impl ProviderId {
    fn of(provider: &Arc<dyn AnchorProvider>) -> Self {
        Self(Arc::as_ptr(provider) as *const () as usize)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Registration handle for a provider.
///
/// Handles compare by the provider they wrap: clones, and handles built
/// with `from_arc` over the same `Arc`, are the same registration.
#[derive(Clone)]
pub struct ProviderHandle {
    id: ProviderId,
    provider: Arc<dyn AnchorProvider>,
}

impl ProviderHandle {
    pub fn new(provider: impl AnchorProvider + 'static) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<dyn AnchorProvider>) -> Self {
        Self {
            id: ProviderId::of(&provider),
            provider,
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn provider(&self) -> &Arc<dyn AnchorProvider> {
        &self.provider
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn is_running(&self) -> bool {
        self.provider.is_running()
    }

    /// Point-in-time description for diagnostics.
    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id,
            name: self.name().to_string(),
            kind: self.kind(),
            running: self.is_running(),
        }
    }
}

impl PartialEq for ProviderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProviderHandle {}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Diagnostic view of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub name: String,
    pub kind: ProviderKind,
    pub running: bool,
}
