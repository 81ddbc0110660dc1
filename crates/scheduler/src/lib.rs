//! Scheduling abstraction for the challenge coordinator.
//!
//! The host may execute work on one cooperative loop or across many
//! parallel regions. This crate probes which model is available once at
//! startup and exposes the same two operations either way: run a task at
//! a fixed period, and run a task once after a delay.

#![warn(missing_docs)]

pub mod adapter;
pub mod cooperative;
pub mod regional;

pub use adapter::{
    detect_scheduler, OnceTask, PeriodicTask, Scheduler, SchedulerError, SchedulerKind,
    TaskFuture, TaskHandle,
};
pub use cooperative::CooperativeScheduler;
pub use regional::RegionScheduler;
