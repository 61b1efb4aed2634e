//! Retrieval of masternode lists from the network.
//!
//! [`RetrievalScheduler`] decides what to request, [`MasternodeSyncManager`] sends
//! the requests and commits what verifies.

mod download_coordinator;
pub mod events;
pub mod masternodes;
pub mod request;
pub mod scheduler;

pub use events::{MasternodeEvent, MasternodeListListener};
pub use masternodes::{MasternodeSyncManager, StepOutcome};
pub use request::{DiffRequest, MasternodeRequest, RequestKind, RotationRequest};
pub use scheduler::{RetrievalScheduler, ScheduledBlock};
