//! Generic per-category progress tracker.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use trihunt_core::{Attributor, AttributionEntry, EntityKey, TrackerSnapshot};

/// Tracks one category's required and completed entities with attribution.
///
/// `record_completion` is the single mutation entry point and the
/// enforcement point for first-completer-wins: an entity outside the
/// catalogue or already completed is a defined no-op, since duplicate
/// event delivery from the host is expected.
#[derive(Debug, Clone)]
pub struct ProgressTracker<E: EntityKey> {
    required: HashSet<E>,
    /// Completion order; display only, never consulted for logic.
    completed: Vec<E>,
    attribution: HashMap<E, Attributor>,
}

impl<E: EntityKey> Default for ProgressTracker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityKey> ProgressTracker<E> {
    /// An empty tracker with no catalogue.
    pub fn new() -> Self {
        Self {
            required: HashSet::new(),
            completed: Vec::new(),
            attribution: HashMap::new(),
        }
    }

    /// Replace the catalogue and clear all progress. Called at session
    /// start and on explicit re-initialization.
    pub fn initialize(&mut self, catalogue: impl IntoIterator<Item = E>) {
        self.required = catalogue.into_iter().collect();
        self.completed.clear();
        self.attribution.clear();
    }

    /// Clear progress, keeping the current catalogue.
    pub fn clear(&mut self) {
        self.completed.clear();
        self.attribution.clear();
    }

    /// Record a completion. Returns `false` (no-op) when the entity is
    /// not catalogued or already completed; the first successful call
    /// owns the attribution forever.
    pub fn record_completion(&mut self, entity: E, attributor: Attributor) -> bool {
        if !self.required.contains(&entity) {
            return false;
        }
        if self.attribution.contains_key(&entity) {
            return false;
        }

        self.completed.push(entity.clone());
        self.attribution.insert(entity, attributor);
        true
    }

    /// Administratively exclude an entity without crediting a participant.
    /// Same idempotency rule as `record_completion`.
    pub fn mark_skipped(&mut self, entity: E) -> bool {
        self.record_completion(entity, Attributor::Skipped)
    }

    /// `(completed, required)` counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.completed.len(), self.required.len())
    }

    /// True when every required entity is completed. Vacuously true for
    /// an empty catalogue; the coordinator guards against declaring an
    /// all-empty challenge complete.
    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.required.len()
    }

    /// True when the catalogue contains `entity`.
    pub fn is_required(&self, entity: &E) -> bool {
        self.required.contains(entity)
    }

    /// True when `entity` has been completed (or skipped).
    pub fn is_completed(&self, entity: &E) -> bool {
        self.attribution.contains_key(entity)
    }

    /// Who was credited with `entity`, if it is completed.
    pub fn attributor_for(&self, entity: &E) -> Option<&Attributor> {
        self.attribution.get(entity)
    }

    /// Completed entities in completion order.
    pub fn completed(&self) -> &[E] {
        &self.completed
    }

    /// Entities still outstanding, sorted by key for a deterministic,
    /// reproducible listing.
    pub fn remaining(&self) -> Vec<E> {
        let mut remaining: Vec<E> = self
            .required
            .iter()
            .filter(|e| !self.attribution.contains_key(*e))
            .cloned()
            .collect();
        remaining.sort();
        remaining
    }

    /// Serializable view of the mutable state.
    pub fn snapshot(&self) -> TrackerSnapshot<E> {
        TrackerSnapshot {
            completed: self.completed.clone(),
            attribution: self
                .completed
                .iter()
                .filter_map(|e| {
                    self.attribution.get(e).map(|by| AttributionEntry {
                        entity: e.clone(),
                        by: by.clone(),
                    })
                })
                .collect(),
            saved_at: chrono::Utc::now(),
        }
    }

    /// Restore progress from a snapshot, dropping entries for entities no
    /// longer in the catalogue (the catalogue may shrink between versions
    /// of the surrounding host).
    pub fn restore(&mut self, snapshot: TrackerSnapshot<E>) {
        self.clear();

        let mut attribution: HashMap<E, Attributor> = snapshot
            .attribution
            .into_iter()
            .map(|entry| (entry.entity, entry.by))
            .collect();

        let mut dropped = 0usize;
        for entity in snapshot.completed {
            if !self.required.contains(&entity) {
                dropped += 1;
                continue;
            }
            if self.attribution.contains_key(&entity) {
                continue;
            }
            let by = attribution
                .remove(&entity)
                .unwrap_or(Attributor::Skipped);
            self.completed.push(entity.clone());
            self.attribution.insert(entity, by);
        }

        if dropped > 0 {
            warn!(dropped, "dropped snapshot entries no longer in the catalogue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trihunt_core::ItemKind;

    fn tracker(catalogue: &[&str]) -> ProgressTracker<ItemKind> {
        let mut t = ProgressTracker::new();
        t.initialize(catalogue.iter().map(|s| ItemKind::from(*s)));
        t
    }

    #[test]
    fn first_completer_wins() {
        let mut t = tracker(&["a", "b"]);

        assert!(t.record_completion(ItemKind::from("a"), Attributor::participant("p1")));
        assert_eq!(t.counts(), (1, 2));

        assert!(!t.record_completion(ItemKind::from("a"), Attributor::participant("p2")));
        assert_eq!(t.counts(), (1, 2));
        assert_eq!(
            t.attributor_for(&ItemKind::from("a")),
            Some(&Attributor::participant("p1"))
        );
    }

    #[test]
    fn uncatalogued_entity_is_a_noop() {
        let mut t = tracker(&["a"]);
        assert!(!t.record_completion(ItemKind::from("z"), Attributor::participant("p1")));
        assert_eq!(t.counts(), (0, 1));
        assert!(!t.is_completed(&ItemKind::from("z")));
    }

    #[test]
    fn skip_uses_the_sentinel_and_is_idempotent() {
        let mut t = tracker(&["a", "b"]);

        assert!(t.mark_skipped(ItemKind::from("a")));
        assert!(!t.mark_skipped(ItemKind::from("a")));
        assert!(t
            .attributor_for(&ItemKind::from("a"))
            .is_some_and(Attributor::is_skipped));

        // a skip does not steal credit from an earlier completer
        assert!(t.record_completion(ItemKind::from("b"), Attributor::participant("p1")));
        assert!(!t.mark_skipped(ItemKind::from("b")));
        assert_eq!(
            t.attributor_for(&ItemKind::from("b")),
            Some(&Attributor::participant("p1"))
        );
    }

    #[test]
    fn completed_keeps_completion_order_remaining_is_sorted() {
        let mut t = tracker(&["c", "a", "b", "d"]);
        t.record_completion(ItemKind::from("b"), Attributor::participant("p1"));
        t.record_completion(ItemKind::from("a"), Attributor::participant("p2"));

        assert_eq!(
            t.completed(),
            &[ItemKind::from("b"), ItemKind::from("a")]
        );
        assert_eq!(t.remaining(), vec![ItemKind::from("c"), ItemKind::from("d")]);
    }

    #[test]
    fn initialize_replaces_catalogue_and_clears_progress() {
        let mut t = tracker(&["a", "b"]);
        t.record_completion(ItemKind::from("a"), Attributor::participant("p1"));

        t.initialize([ItemKind::from("x")]);
        assert_eq!(t.counts(), (0, 1));
        assert!(!t.is_completed(&ItemKind::from("a")));
        assert!(t.is_required(&ItemKind::from("x")));
    }

    #[test]
    fn clear_keeps_catalogue() {
        let mut t = tracker(&["a", "b"]);
        t.record_completion(ItemKind::from("a"), Attributor::participant("p1"));
        t.clear();
        assert_eq!(t.counts(), (0, 2));
        assert!(t.is_required(&ItemKind::from("a")));
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut t = tracker(&["a", "b", "c"]);
        t.record_completion(ItemKind::from("b"), Attributor::participant("p1"));
        t.mark_skipped(ItemKind::from("c"));

        let snap = t.snapshot();

        let mut restored = tracker(&["a", "b", "c"]);
        restored.restore(snap);

        assert_eq!(restored.counts(), (2, 3));
        assert_eq!(restored.completed(), t.completed());
        assert_eq!(
            restored.attributor_for(&ItemKind::from("b")),
            Some(&Attributor::participant("p1"))
        );
        assert!(restored
            .attributor_for(&ItemKind::from("c"))
            .is_some_and(Attributor::is_skipped));
    }

    #[test]
    fn restore_drops_entities_removed_from_the_catalogue() {
        let mut t = tracker(&["a", "b"]);
        t.record_completion(ItemKind::from("a"), Attributor::participant("p1"));
        t.record_completion(ItemKind::from("b"), Attributor::participant("p2"));
        let snap = t.snapshot();

        // "b" no longer exists in this version of the catalogue
        let mut shrunk = tracker(&["a"]);
        shrunk.restore(snap);

        assert_eq!(shrunk.counts(), (1, 1));
        assert!(shrunk.is_completed(&ItemKind::from("a")));
        assert!(!shrunk.is_completed(&ItemKind::from("b")));
    }

    #[test]
    fn empty_catalogue_counts_are_zero() {
        let t: ProgressTracker<ItemKind> = ProgressTracker::new();
        assert_eq!(t.counts(), (0, 0));
        assert!(t.remaining().is_empty());
    }
}
