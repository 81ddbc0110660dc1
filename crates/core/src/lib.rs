//! Trihunt core data models.
//!
//! This crate defines the fundamental types shared by the challenge
//! coordinator: entity keys, categories, attribution, the session clock
//! and the event model.

#![warn(missing_docs)]

// Identity and attribution
mod category;
mod attributor;

// Session timing
mod clock;

// Event emission
mod event;

// Persisted state shapes
mod snapshot;

// Re-exports
pub use category::{Category, CreatureKind, EntityKey, ItemKind, MilestoneKey};
pub use attributor::Attributor;
pub use clock::{detailed_elapsed, format_elapsed, ClockState, SessionClock};
pub use event::ChallengeEvent;
pub use snapshot::{AttributionEntry, ClockSnapshot, TrackerSnapshot};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
