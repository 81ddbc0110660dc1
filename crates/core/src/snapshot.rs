//! Persisted state shapes for the clock and the trackers.
//!
//! These are the only types crossing the snapshot-store boundary. The
//! attribution map is stored as a list of entries rather than a JSON
//! object so entity keys are not forced to be strings.

use crate::{Attributor, ClockState, Time};
use serde::{Deserialize, Serialize};

/// Persisted clock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    /// Clock state at save time. Restored `running` is coerced to paused.
    pub state: ClockState,
    /// Elapsed seconds at save time.
    pub elapsed_seconds: u64,
    /// When the snapshot was written.
    pub saved_at: Time,
}

/// One attribution record inside a tracker snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionEntry<E> {
    /// The completed entity.
    pub entity: E,
    /// Who was credited.
    pub by: Attributor,
}

/// Persisted tracker state for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSnapshot<E> {
    /// Completed entities in completion order.
    pub completed: Vec<E>,
    /// Attribution per completed entity.
    pub attribution: Vec<AttributionEntry<E>>,
    /// When the snapshot was written.
    pub saved_at: Time,
}

impl<E> TrackerSnapshot<E> {
    /// An empty snapshot stamped now.
    pub fn empty() -> Self {
        Self {
            completed: Vec::new(),
            attribution: Vec::new(),
            saved_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemKind;

    #[test]
    fn tracker_snapshot_round_trips_as_json() {
        let snap = TrackerSnapshot {
            completed: vec![ItemKind::new("apple"), ItemKind::new("bread")],
            attribution: vec![
                AttributionEntry {
                    entity: ItemKind::new("apple"),
                    by: Attributor::participant("p1"),
                },
                AttributionEntry {
                    entity: ItemKind::new("bread"),
                    by: Attributor::Skipped,
                },
            ],
            saved_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&snap).unwrap();
        let back: TrackerSnapshot<ItemKind> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn clock_snapshot_state_serializes_snake_case() {
        let snap = ClockSnapshot {
            state: ClockState::Running,
            elapsed_seconds: 42,
            saved_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["elapsed_seconds"], 42);
    }
}
