//! Change notifications broadcast by [`crate::SpinEngine`].
//!
//! Events carry handles and clear thresholds only, never plaintext.

use cspin_core::{HandleId, Principal, Timestamp};
use cspin_state::ConfigRecord;
use serde::{Deserialize, Serialize};

use crate::engine::OutcomeHandles;

/// A completed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A principal's classification was committed.
    SpinClassified {
        /// Whose outcome changed.
        principal: Principal,
        /// The new handles.
        handles: OutcomeHandles,
    },
    /// The administrator replaced the thresholds.
    ThresholdsUpdated {
        /// The new record.
        record: ConfigRecord,
    },
    /// A win handle became publicly readable.
    WinFlagPublished {
        /// Whose win flag was published.
        principal: Principal,
        /// The published handle.
        win_handle: HandleId,
        /// When it was published.
        revealed_at: Timestamp,
    },
}

impl EngineEvent {
    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SpinClassified { .. } => "spin_classified",
            Self::ThresholdsUpdated { .. } => "thresholds_updated",
            Self::WinFlagPublished { .. } => "win_flag_published",
        }
    }
}
