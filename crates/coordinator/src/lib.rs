//! Challenge coordination service.
//!
//! Composes the three category trackers and the session clock, derives
//! aggregate progress, detects the all-categories-complete condition
//! exactly once and orchestrates snapshot persistence.

#![warn(missing_docs)]

mod tracker;
mod coordinator;

pub use tracker::ProgressTracker;
pub use coordinator::{Catalogues, ChallengeCoordinator, CategoryProgress};
