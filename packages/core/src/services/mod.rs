//! Service Layer
//!
//! The orchestration layer above the arena and the edit algorithms:
//! [`NodeService`] for CRUD and structural commands, [`ViewStateService`]
//! for collapse persistence, [`PendingIdentityManager`] for durable
//! identifiers, and the [`DomainEvent`] stream that ties the engine to its
//! host.

pub mod error;
pub mod events;
pub mod node_service;
pub mod pending_identity;
pub mod view_state;

pub use error::NodeServiceError;
pub use events::{DomainEvent, DOMAIN_EVENT_CHANNEL_CAPACITY};
pub use node_service::{CreateNodeParams, NodeService, UpdateNodeParams};
pub use pending_identity::{
    IdentityFinalizer, PendingIdentityManager, IDENTITY_QUIET_PERIOD, IDENTITY_RETRY_DELAY,
};
pub use view_state::{
    CollapseChange, CollapseStore, LoadState, ViewStateConfig, ViewStateError, ViewStateService,
};
