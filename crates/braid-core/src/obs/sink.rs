//! Metrics sink boundary.
//!
//! Engine logic MUST NOT depend on `obs::metrics` directly. All
//! instrumentation flows through `MetricsEvent` and `MetricsSink`; this
//! module is the only bridge between execution logic and the global
//! metrics state. Events never affect execution semantics.

use crate::{obs::metrics, violation::ViolationKind};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// MergeOutcomeKind
///

#[derive(Clone, Copy, Debug)]
pub enum MergeOutcomeKind {
    Clean,
    Violations,
    Conflicts,
    FastForward,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    MergeStart,
    TableMerged {
        edits: u64,
        conflicts: u64,
    },
    ViolationRecorded {
        kind: ViolationKind,
    },
    MergeFinish {
        outcome: MergeOutcomeKind,
    },
    CommitBlocked,
    VerifyRun {
        violations: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopMetricsSink
///

pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _: MetricsEvent) {}
}

///
/// GlobalMetricsSink
///

pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::MergeStart => {
                m.merges_started = m.merges_started.saturating_add(1);
            }
            MetricsEvent::TableMerged { edits, conflicts } => {
                m.tables_merged = m.tables_merged.saturating_add(1);
                m.edits_emitted = m.edits_emitted.saturating_add(edits);
                m.conflicts_recorded = m.conflicts_recorded.saturating_add(conflicts);
            }
            MetricsEvent::ViolationRecorded { kind } => match kind {
                ViolationKind::ForeignKey => {
                    m.fk_violations = m.fk_violations.saturating_add(1);
                }
                ViolationKind::UniqueIndex => {
                    m.unique_violations = m.unique_violations.saturating_add(1);
                }
                ViolationKind::CheckConstraint | ViolationKind::NotNull => {
                    m.other_violations = m.other_violations.saturating_add(1);
                }
            },
            MetricsEvent::MergeFinish { .. } => {
                m.merges_finished = m.merges_finished.saturating_add(1);
            }
            MetricsEvent::CommitBlocked => {
                m.commits_blocked = m.commits_blocked.saturating_add(1);
            }
            MetricsEvent::VerifyRun { violations } => {
                m.verify_runs = m.verify_runs.saturating_add(1);
                m.verify_violations = m.verify_violations.saturating_add(violations);
            }
        });
    }
}

/// Record one event against the active sink.
pub fn record(event: MetricsEvent) {
    SINK_OVERRIDE.with_borrow(|sink| match sink {
        Some(sink) => {
            // SAFETY: the pointer is scoped by `with_metrics_sink`, which
            // clears it before the borrowed sink can go out of scope.
            unsafe { (**sink).record(event) }
        }
        None => GlobalMetricsSink.record(event),
    });
}

/// Run `f` with `sink` receiving every event recorded on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Reset(Option<*const dyn MetricsSink>);
    impl Drop for Reset {
        fn drop(&mut self) {
            SINK_OVERRIDE.with_borrow_mut(|current| *current = self.0.take());
        }
    }

    // SAFETY: the erased pointer is only ever dereferenced while still
    // within this function's call to `f()` (see `record`'s SAFETY note),
    // so the `'static` bound on the stored raw pointer is never relied on
    // past the lifetime of `sink`.
    let erased: *const dyn MetricsSink =
        unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let previous = SINK_OVERRIDE.with_borrow_mut(|current| current.replace(erased));
    let _reset = Reset(previous);
    f()
}
