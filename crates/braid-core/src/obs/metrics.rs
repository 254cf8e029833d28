//! Global event counters.
//!
//! Monotonic per-thread totals, reset only by `metrics_reset`. Reads
//! return a snapshot copy so reporting never holds the state borrow.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

thread_local! {
    static STATE: RefCell<EventReport> = RefCell::new(EventReport::default());
}

///
/// EventReport
///
/// Snapshot of every counter the global sink maintains.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub merges_started: u64,
    pub merges_finished: u64,
    pub tables_merged: u64,
    pub edits_emitted: u64,
    pub conflicts_recorded: u64,
    pub fk_violations: u64,
    pub unique_violations: u64,
    pub other_violations: u64,
    pub commits_blocked: u64,
    pub verify_runs: u64,
    pub verify_violations: u64,
}

impl EventReport {
    #[must_use]
    pub const fn total_violations(&self) -> u64 {
        self.fk_violations + self.unique_violations + self.other_violations
    }
}

pub(crate) fn with_state_mut<T>(f: impl FnOnce(&mut EventReport) -> T) -> T {
    STATE.with_borrow_mut(f)
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    STATE.with_borrow(|state| *state)
}

/// Zero every counter.
pub fn metrics_reset() {
    STATE.with_borrow_mut(|state| *state = EventReport::default());
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::sink::{MetricsEvent, record};
    use crate::violation::ViolationKind;

    #[test]
    fn global_sink_accumulates_and_resets() {
        metrics_reset();
        record(MetricsEvent::MergeStart);
        record(MetricsEvent::ViolationRecorded {
            kind: ViolationKind::ForeignKey,
        });
        record(MetricsEvent::ViolationRecorded {
            kind: ViolationKind::UniqueIndex,
        });

        let report = metrics_report();
        assert_eq!(report.merges_started, 1);
        assert_eq!(report.total_violations(), 2);

        metrics_reset();
        assert_eq!(metrics_report(), EventReport::default());
    }

    #[test]
    fn override_sink_captures_events() {
        use crate::obs::sink::{MetricsSink, with_metrics_sink};
        use std::cell::Cell;

        struct Counting(Cell<u64>);
        impl MetricsSink for Counting {
            fn record(&self, _: MetricsEvent) {
                self.0.set(self.0.get() + 1);
            }
        }

        metrics_reset();
        let sink = Counting(Cell::new(0));
        with_metrics_sink(&sink, || {
            record(MetricsEvent::MergeStart);
            record(MetricsEvent::CommitBlocked);
        });

        assert_eq!(sink.0.get(), 2);
        // Nothing leaked into the global counters.
        assert_eq!(metrics_report(), EventReport::default());
    }
}
