//! Events emitted by the coordinator for the presentation layer.
//!
//! The core never renders or broadcasts text itself; it emits these and
//! lets the host react (chat broadcast, sound, title, tablist).

use crate::{Attributor, Category};
use serde::{Deserialize, Serialize};

/// A notable change in the challenge, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeEvent {
    /// A new session started.
    Started {
        /// Total entities required across all categories.
        total_required: usize,
    },
    /// The session was stopped by an administrator.
    Stopped {
        /// Final formatted time.
        elapsed: String,
    },
    /// The clock paused; `auto` distinguishes presence-driven pauses from
    /// admin ones for messaging only.
    Paused {
        /// True when induced by everyone disconnecting.
        auto: bool,
        /// Formatted time at the moment of pausing.
        elapsed: String,
    },
    /// The clock resumed.
    Resumed {
        /// True when induced by a participant connecting.
        auto: bool,
        /// Formatted time at the moment of resuming.
        elapsed: String,
    },
    /// An entity was completed for the first time.
    EntityCompleted {
        /// Which tracker recorded it.
        category: Category,
        /// The completed entity's stable key.
        entity: String,
        /// Who gets the credit.
        by: Attributor,
        /// Completed count in that category after this completion.
        completed: usize,
        /// Required count in that category.
        required: usize,
    },
    /// Every category reached 100%. Emitted exactly once per session.
    ChallengeComplete {
        /// Final elapsed seconds.
        elapsed_seconds: u64,
        /// Final formatted time.
        elapsed: String,
    },
}
