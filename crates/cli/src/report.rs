//! Text rendering for progress reports and live events.

use trihunt_core::{detailed_elapsed, Category, ChallengeEvent, ClockState};
use trihunt_coordinator::{CategoryProgress, ChallengeCoordinator};
use trihunt_storage::SnapshotStore;

const BAR_SEGMENTS: usize = 20;

/// `[##########----------] 50.0% (2/4)` style bar.
pub fn progress_bar(progress: CategoryProgress) -> String {
    let filled = if progress.required == 0 {
        0
    } else {
        progress.completed * BAR_SEGMENTS / progress.required
    };

    let mut bar = String::with_capacity(BAR_SEGMENTS + 2);
    bar.push('[');
    for i in 0..BAR_SEGMENTS {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');

    format!(
        "{} {:.1}% ({}/{})",
        bar,
        progress.percent(),
        progress.completed,
        progress.required
    )
}

/// Full multi-line status report.
pub fn render_report<S: SnapshotStore>(coordinator: &ChallengeCoordinator<S>) -> String {
    let (completed, required) = coordinator.aggregate_progress();
    let overall = CategoryProgress {
        completed,
        required,
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Challenge: {} | {}\n",
        clock_label(coordinator.clock_state(), coordinator.is_complete()),
        coordinator.formatted_elapsed(),
    ));
    out.push_str(&format!("  overall    {}\n", progress_bar(overall)));
    for category in Category::ALL {
        out.push_str(&format!(
            "  {:<10} {}\n",
            category.as_str(),
            progress_bar(coordinator.category_progress(category)),
        ));
    }
    out
}

fn clock_label(state: ClockState, complete: bool) -> &'static str {
    if complete {
        return "COMPLETE";
    }
    match state {
        ClockState::Inactive => "INACTIVE",
        ClockState::Running => "RUNNING",
        ClockState::Paused => "PAUSED",
    }
}

/// One broadcast line per event, in the voice of the original chat
/// announcements.
pub fn render_event(event: &ChallengeEvent) -> String {
    match event {
        ChallengeEvent::Started { total_required } => {
            format!("Challenge started! {} entries to complete.", total_required)
        }
        ChallengeEvent::Stopped { elapsed } => {
            format!("Challenge stopped at {}.", elapsed)
        }
        ChallengeEvent::Paused { auto: true, elapsed } => {
            format!("Timer auto-paused at {} (nobody online).", elapsed)
        }
        ChallengeEvent::Paused {
            auto: false,
            elapsed,
        } => format!("Timer paused at {}.", elapsed),
        ChallengeEvent::Resumed { auto: true, elapsed } => {
            format!("Timer resumed at {} (participant online).", elapsed)
        }
        ChallengeEvent::Resumed {
            auto: false,
            elapsed,
        } => format!("Timer resumed at {}.", elapsed),
        ChallengeEvent::EntityCompleted {
            category,
            entity,
            by,
            completed,
            required,
        } => {
            if by.is_skipped() {
                format!(
                    "{} skipped ({} {}/{})",
                    entity, category, completed, required
                )
            } else {
                format!(
                    "{} completed {} ({} {}/{})",
                    by, entity, category, completed, required
                )
            }
        }
        ChallengeEvent::ChallengeComplete {
            elapsed_seconds,
            elapsed,
        } => format!(
            "CHALLENGE COMPLETE in {} ({})!",
            elapsed,
            detailed_elapsed(*elapsed_seconds)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trihunt_core::Attributor;

    #[test]
    fn bar_is_twenty_segments() {
        let bar = progress_bar(CategoryProgress {
            completed: 2,
            required: 4,
        });
        assert!(bar.starts_with("[##########----------]"));
        assert!(bar.contains("50.0%"));
        assert!(bar.contains("(2/4)"));
    }

    #[test]
    fn empty_catalogue_bar_is_all_empty() {
        let bar = progress_bar(CategoryProgress {
            completed: 0,
            required: 0,
        });
        assert!(bar.starts_with("[--------------------]"));
        assert!(bar.contains("0.0%"));
    }

    #[test]
    fn completion_event_names_the_participant() {
        let line = render_event(&ChallengeEvent::EntityCompleted {
            category: Category::Items,
            entity: "apple".to_string(),
            by: Attributor::participant("p1"),
            completed: 1,
            required: 4,
        });
        assert_eq!(line, "p1 completed apple (items 1/4)");
    }

    #[test]
    fn skip_event_does_not_credit_anyone() {
        let line = render_event(&ChallengeEvent::EntityCompleted {
            category: Category::Creatures,
            entity: "wolf".to_string(),
            by: Attributor::Skipped,
            completed: 2,
            required: 3,
        });
        assert_eq!(line, "wolf skipped (creatures 2/3)");
    }

    #[test]
    fn terminal_event_includes_the_long_form_time() {
        let line = render_event(&ChallengeEvent::ChallengeComplete {
            elapsed_seconds: 65,
            elapsed: "01:05".to_string(),
        });
        assert_eq!(line, "CHALLENGE COMPLETE in 01:05 (1 minute 5 seconds)!");
    }
}
