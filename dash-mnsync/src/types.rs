//! Common type definitions for masternode list synchronization.

use std::fmt;

use dash_sml::prelude::CoreBlockHeight;
use serde::{Deserialize, Serialize};

/// Identifies a connected peer for the lifetime of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Which messages are used to retrieve masternode lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// One `getmnlistd` per wanted block.
    Diff,
    /// `getqrinfo` for the tip, carrying the lists of the rotation cycles.
    Rotation,
    /// `getqrinfo` for the tip, `getmnlistd` for everything else.
    #[default]
    Mixed,
}

/// Snapshot of the retrieval progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncProgress {
    /// Requests waiting to be sent.
    pub queued: usize,
    /// Requests sent and not answered yet.
    pub in_flight: usize,
    /// Largest amount of outstanding requests seen since the queue was last empty.
    pub max_amount: usize,
    /// Lists committed since the scheduler was created.
    pub committed: usize,
    /// Height of the last committed list.
    pub last_height: Option<CoreBlockHeight>,
}

impl SyncProgress {
    /// Share of the work done, between 0 and 1.
    pub fn fraction(&self) -> f64 {
        if self.max_amount == 0 {
            return 1.0;
        }
        let remaining = (self.queued + self.in_flight).min(self.max_amount);
        1.0 - remaining as f64 / self.max_amount as f64
    }

    pub fn is_complete(&self) -> bool {
        self.queued == 0 && self.in_flight == 0
    }
}
