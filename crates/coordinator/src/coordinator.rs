//! The challenge coordinator.
//!
//! Exclusive owner of the three trackers and the session clock. All
//! mutations pass through one mutex so `record_completion`'s
//! check-then-insert and the three-tracker completion read stay atomic
//! with respect to each other under parallel-region execution; under the
//! cooperative scheduler the mutex is simply uncontended. No lock is
//! held across an await: snapshot state is captured under the lock and
//! written outside it, serialized by a dedicated save mutex.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use trihunt_core::{
    Attributor, Category, ClockSnapshot, CreatureKind, ChallengeEvent, ItemKind, MilestoneKey,
    SessionClock, TrackerSnapshot,
};
use trihunt_storage::{SnapshotStore, StorageError};

use crate::ProgressTracker;

/// Snapshot namespace for the clock.
const NS_TIMER: &str = "timer";

/// Event channel capacity; laggy subscribers drop old events.
const EVENT_CAPACITY: usize = 64;

/// Host-supplied catalogues for one session. Which entities belong in a
/// catalogue is the host's concern; the coordinator treats them as opaque.
#[derive(Debug, Clone, Default)]
pub struct Catalogues {
    /// Items to be acquired.
    pub items: Vec<ItemKind>,
    /// Creature kinds to be killed.
    pub creatures: Vec<CreatureKind>,
    /// Milestones to be unlocked.
    pub milestones: Vec<MilestoneKey>,
}

/// Read-only progress of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProgress {
    /// Completed entity count.
    pub completed: usize,
    /// Required entity count.
    pub required: usize,
}

impl CategoryProgress {
    /// Percentage with a defined 0% for an empty catalogue.
    pub fn percent(&self) -> f64 {
        if self.required == 0 {
            0.0
        } else {
            self.completed as f64 / self.required as f64 * 100.0
        }
    }
}

struct ChallengeState {
    items: ProgressTracker<ItemKind>,
    creatures: ProgressTracker<CreatureKind>,
    milestones: ProgressTracker<MilestoneKey>,
    clock: SessionClock,
    /// Guards the terminal broadcast so it fires exactly once even if
    /// several categories reach 100% in the same tick.
    completion_latched: bool,
}

impl ChallengeState {
    fn new() -> Self {
        Self {
            items: ProgressTracker::new(),
            creatures: ProgressTracker::new(),
            milestones: ProgressTracker::new(),
            clock: SessionClock::new(),
            completion_latched: false,
        }
    }

    fn aggregate(&self) -> (usize, usize) {
        let (ic, ir) = self.items.counts();
        let (cc, cr) = self.creatures.counts();
        let (mc, mr) = self.milestones.counts();
        (ic + cc + mc, ir + cr + mr)
    }

    fn all_complete(&self) -> bool {
        let (_, required) = self.aggregate();
        required > 0
            && self.items.is_complete()
            && self.creatures.is_complete()
            && self.milestones.is_complete()
    }
}

/// Coordinates the timed three-category completion challenge.
///
/// Cheap to clone; clones share the same state, store and event channel.
pub struct ChallengeCoordinator<S: SnapshotStore> {
    state: Arc<Mutex<ChallengeState>>,
    store: Arc<S>,
    /// Serializes snapshot writes; a write in progress is never
    /// interleaved with another and shutdown awaits it.
    save_lock: Arc<tokio::sync::Mutex<()>>,
    events: broadcast::Sender<ChallengeEvent>,
}

impl<S: SnapshotStore> Clone for ChallengeCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            store: self.store.clone(),
            save_lock: self.save_lock.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: SnapshotStore> ChallengeCoordinator<S> {
    /// Create a coordinator with no active session.
    pub fn new(store: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ChallengeState::new())),
            store: Arc::new(store),
            save_lock: Arc::new(tokio::sync::Mutex::new(())),
            events,
        }
    }

    /// Subscribe to coordinator events for broadcast/rendering.
    pub fn subscribe(&self) -> broadcast::Receiver<ChallengeEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ChallengeState> {
        // Poisoning only follows a panic in another holder; the state
        // itself is still consistent, every mutation is single-step.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ChallengeEvent) {
        // No subscribers is fine; emission is fire-and-forget.
        let _ = self.events.send(event);
    }

    // === Session control ===

    /// Install the catalogues without starting a session. Clears any
    /// in-memory progress; used at host startup before restoring a
    /// snapshot, since restore filters against the installed catalogues.
    pub fn install_catalogues(&self, catalogues: Catalogues) {
        let mut state = self.lock();
        state.items.initialize(catalogues.items);
        state.creatures.initialize(catalogues.creatures);
        state.milestones.initialize(catalogues.milestones);
        state.completion_latched = false;
    }

    /// Start a new session over the given catalogues. Refused (returns
    /// `false`) while a session is active or when every catalogue is
    /// empty.
    pub fn start(&self, catalogues: Catalogues) -> bool {
        let mut state = self.lock();
        if state.clock.is_active() {
            return false;
        }

        // Count distinct keys; the trackers dedupe on initialize and the
        // announced total must match every later count.
        let total = catalogues.items.iter().collect::<HashSet<_>>().len()
            + catalogues.creatures.iter().collect::<HashSet<_>>().len()
            + catalogues.milestones.iter().collect::<HashSet<_>>().len();
        if total == 0 {
            return false;
        }

        state.items.initialize(catalogues.items);
        state.creatures.initialize(catalogues.creatures);
        state.milestones.initialize(catalogues.milestones);
        state.completion_latched = false;
        state.clock.start();

        info!(total_required = total, "challenge started");
        self.emit(ChallengeEvent::Started {
            total_required: total,
        });
        true
    }

    /// Stop the session, keeping the elapsed time for display.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        if !state.clock.is_active() {
            return false;
        }
        state.clock.stop();
        let elapsed = state.clock.formatted();
        info!(%elapsed, "challenge stopped");
        self.emit(ChallengeEvent::Stopped { elapsed });
        true
    }

    /// Admin pause. No-op unless the clock is running.
    pub fn pause(&self) -> bool {
        self.pause_inner(false)
    }

    /// Admin resume. No-op unless the clock is paused.
    pub fn resume(&self) -> bool {
        self.resume_inner(false)
    }

    fn pause_inner(&self, auto: bool) -> bool {
        let mut state = self.lock();
        if !state.clock.pause() {
            return false;
        }
        let elapsed = state.clock.formatted();
        info!(%elapsed, auto, "timer paused");
        self.emit(ChallengeEvent::Paused { auto, elapsed });
        true
    }

    fn resume_inner(&self, auto: bool) -> bool {
        let mut state = self.lock();
        if !state.clock.resume() {
            return false;
        }
        let elapsed = state.clock.formatted();
        info!(%elapsed, auto, "timer resumed");
        self.emit(ChallengeEvent::Resumed { auto, elapsed });
        true
    }

    // === Presence signals ===

    /// Exactly zero participants are now connected: auto-pause if
    /// running. Repeated signals while already paused are no-ops.
    pub fn presence_lost(&self) {
        self.pause_inner(true);
    }

    /// At least one participant is now connected: resume if paused,
    /// however the pause came about.
    pub fn presence_gained(&self) {
        self.resume_inner(true);
    }

    // === Scheduler-driven ===

    /// Advance the clock by exactly one second. A tick that fires late
    /// still counts once; the scheduler never replays missed ticks.
    pub fn tick(&self) {
        self.lock().clock.tick();
    }

    // === Completion recording ===

    /// Credit a participant with acquiring an item.
    pub fn record_item(&self, entity: ItemKind, by: Attributor) -> bool {
        let mut state = self.lock();
        if !state.items.record_completion(entity.clone(), by.clone()) {
            return false;
        }
        let (completed, required) = state.items.counts();
        self.emit_completion(&mut state, Category::Items, entity.to_string(), by, completed, required);
        true
    }

    /// Credit a participant with killing a creature kind.
    pub fn record_creature(&self, entity: CreatureKind, by: Attributor) -> bool {
        let mut state = self.lock();
        if !state.creatures.record_completion(entity.clone(), by.clone()) {
            return false;
        }
        let (completed, required) = state.creatures.counts();
        self.emit_completion(&mut state, Category::Creatures, entity.to_string(), by, completed, required);
        true
    }

    /// Credit a participant with unlocking a milestone.
    pub fn record_milestone(&self, entity: MilestoneKey, by: Attributor) -> bool {
        let mut state = self.lock();
        if !state.milestones.record_completion(entity.clone(), by.clone()) {
            return false;
        }
        let (completed, required) = state.milestones.counts();
        self.emit_completion(&mut state, Category::Milestones, entity.to_string(), by, completed, required);
        true
    }

    /// Administratively skip an item.
    pub fn skip_item(&self, entity: ItemKind) -> bool {
        self.record_item(entity, Attributor::Skipped)
    }

    /// Administratively skip a creature kind.
    pub fn skip_creature(&self, entity: CreatureKind) -> bool {
        self.record_creature(entity, Attributor::Skipped)
    }

    /// Administratively skip a milestone.
    pub fn skip_milestone(&self, entity: MilestoneKey) -> bool {
        self.record_milestone(entity, Attributor::Skipped)
    }

    fn emit_completion(
        &self,
        state: &mut ChallengeState,
        category: Category,
        entity: String,
        by: Attributor,
        completed: usize,
        required: usize,
    ) {
        self.emit(ChallengeEvent::EntityCompleted {
            category,
            entity,
            by,
            completed,
            required,
        });
        self.check_completion_locked(state);
    }

    /// Re-run the completion check. Safe to call at any time; the latch
    /// makes the terminal transition at-most-once per session.
    pub fn check_completion(&self) {
        let mut state = self.lock();
        self.check_completion_locked(&mut state);
    }

    fn check_completion_locked(&self, state: &mut ChallengeState) {
        if state.completion_latched || !state.all_complete() {
            return;
        }
        state.completion_latched = true;
        state.clock.stop();

        let elapsed_seconds = state.clock.elapsed_seconds();
        let elapsed = state.clock.formatted();
        info!(%elapsed, "challenge complete");
        self.emit(ChallengeEvent::ChallengeComplete {
            elapsed_seconds,
            elapsed,
        });
    }

    // === Queries ===

    /// `(total_completed, total_required)` across all categories.
    pub fn aggregate_progress(&self) -> (usize, usize) {
        self.lock().aggregate()
    }

    /// Overall percentage; a challenge with no catalogued entities is a
    /// defined 0%, never a division error.
    pub fn overall_percent(&self) -> f64 {
        let (completed, required) = self.aggregate_progress();
        if required == 0 {
            0.0
        } else {
            completed as f64 / required as f64 * 100.0
        }
    }

    /// Progress of one category.
    pub fn category_progress(&self, category: Category) -> CategoryProgress {
        let state = self.lock();
        let (completed, required) = match category {
            Category::Items => state.items.counts(),
            Category::Creatures => state.creatures.counts(),
            Category::Milestones => state.milestones.counts(),
        };
        CategoryProgress {
            completed,
            required,
        }
    }

    /// Outstanding items, deterministically sorted.
    pub fn remaining_items(&self) -> Vec<ItemKind> {
        self.lock().items.remaining()
    }

    /// Outstanding creature kinds, deterministically sorted.
    pub fn remaining_creatures(&self) -> Vec<CreatureKind> {
        self.lock().creatures.remaining()
    }

    /// Outstanding milestones, deterministically sorted.
    pub fn remaining_milestones(&self) -> Vec<MilestoneKey> {
        self.lock().milestones.remaining()
    }

    /// True while a session is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        self.lock().clock.is_active()
    }

    /// True once the terminal transition has fired this session.
    pub fn is_complete(&self) -> bool {
        self.lock().completion_latched
    }

    /// Elapsed seconds on the session clock.
    pub fn elapsed_seconds(&self) -> u64 {
        self.lock().clock.elapsed_seconds()
    }

    /// Formatted elapsed time.
    pub fn formatted_elapsed(&self) -> String {
        self.lock().clock.formatted()
    }

    /// Clock state for display.
    pub fn clock_state(&self) -> trihunt_core::ClockState {
        self.lock().clock.state()
    }

    // === Persistence ===

    /// Persist clock and tracker state. A failed write is logged and
    /// reported but never aborts the session; in-memory state stays
    /// authoritative until the next successful write.
    pub async fn save_snapshot(&self) -> Result<(), StorageError> {
        let (clock, items, creatures, milestones) = {
            let state = self.lock();
            let clock = ClockSnapshot {
                state: state.clock.state(),
                elapsed_seconds: state.clock.elapsed_seconds(),
                saved_at: chrono::Utc::now(),
            };
            (
                clock,
                state.items.snapshot(),
                state.creatures.snapshot(),
                state.milestones.snapshot(),
            )
        };

        let _write_guard = self.save_lock.lock().await;
        let result = self
            .write_all(&clock, &items, &creatures, &milestones)
            .await;
        if let Err(e) = &result {
            error!(error = %e, "snapshot write failed; keeping in-memory state");
        }
        result
    }

    async fn write_all(
        &self,
        clock: &ClockSnapshot,
        items: &TrackerSnapshot<ItemKind>,
        creatures: &TrackerSnapshot<CreatureKind>,
        milestones: &TrackerSnapshot<MilestoneKey>,
    ) -> Result<(), StorageError> {
        self.store
            .save(NS_TIMER, &serde_json::to_value(clock)?)
            .await?;
        self.store
            .save(Category::Items.as_str(), &serde_json::to_value(items)?)
            .await?;
        self.store
            .save(Category::Creatures.as_str(), &serde_json::to_value(creatures)?)
            .await?;
        self.store
            .save(Category::Milestones.as_str(), &serde_json::to_value(milestones)?)
            .await?;
        Ok(())
    }

    /// Restore clock then trackers from the store, then re-derive the
    /// completion latch from the restored counts. A challenge that was
    /// already complete on disk does NOT re-emit the terminal event;
    /// only the internal flag is set.
    pub async fn load_snapshot(&self) -> Result<(), StorageError> {
        let clock: Option<ClockSnapshot> = self.load_namespace(NS_TIMER).await?;
        let items: Option<TrackerSnapshot<ItemKind>> =
            self.load_namespace(Category::Items.as_str()).await?;
        let creatures: Option<TrackerSnapshot<CreatureKind>> =
            self.load_namespace(Category::Creatures.as_str()).await?;
        let milestones: Option<TrackerSnapshot<MilestoneKey>> =
            self.load_namespace(Category::Milestones.as_str()).await?;

        let mut state = self.lock();
        if let Some(clock) = clock {
            state.clock.restore(clock.state, clock.elapsed_seconds);
            info!(
                elapsed = %state.clock.formatted(),
                state = ?state.clock.state(),
                "restored session clock"
            );
        }
        if let Some(snap) = items {
            state.items.restore(snap);
        }
        if let Some(snap) = creatures {
            state.creatures.restore(snap);
        }
        if let Some(snap) = milestones {
            state.milestones.restore(snap);
        }

        state.completion_latched = state.all_complete();
        Ok(())
    }

    async fn load_namespace<T: serde::de::DeserializeOwned>(
        &self,
        namespace: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.store.load(namespace).await? {
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => {
                    // Catalogue-version tolerance: an unreadable snapshot
                    // is treated as absent, not fatal.
                    warn!(namespace, error = %e, "ignoring unreadable snapshot");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Re-initialize everything: clear tracker progress, reset the
    /// clock, clear the latch and delete persisted snapshots. The
    /// two-step confirmation lives at the command boundary.
    pub async fn reset_all(&self) -> Result<(), StorageError> {
        {
            let mut state = self.lock();
            state.items.clear();
            state.creatures.clear();
            state.milestones.clear();
            state.clock.reset();
            state.completion_latched = false;
        }

        let _write_guard = self.save_lock.lock().await;
        self.store.delete(NS_TIMER).await?;
        self.store.delete(Category::Items.as_str()).await?;
        self.store.delete(Category::Creatures.as_str()).await?;
        self.store.delete(Category::Milestones.as_str()).await?;

        info!("challenge data reset");
        Ok(())
    }

    /// Access the underlying store (for host wiring).
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Raw JSON view of a namespace, mainly for diagnostics.
    pub async fn raw_snapshot(&self, namespace: &str) -> Result<Option<Value>, StorageError> {
        self.store.load(namespace).await
    }
}
