//! Anchor Hub - provider-agnostic spatial anchor mediator
//!
//! Registers anchor backends (on-device tracking, cloud anchor services),
//! dispatches anchor requests across them in registration order, and relays
//! every registered backend's events through a single stream.
//!
//! Callers only touch [`AnchorSystem`]; backends implement
//! [`AnchorProvider`].

pub mod anchor;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod provider;
pub mod registry;
pub mod request;
pub mod system;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use anchor::{AnchorId, AnchorSearch, AnchorTarget, Orientation, Pose, Position};
pub use config::Config;
pub use events::{AnchorEvent, AnchorEventReceiver, EventFilter, EventKind, RelayedEvent};
pub use provider::{AnchorProvider, ProviderError, ProviderHandle, ProviderInfo, ProviderKind};
pub use request::{CreateAnchorRequest, MoveAnchorRequest, RequestError};
pub use system::{AnchorSystem, AnchorSystemBuilder};
