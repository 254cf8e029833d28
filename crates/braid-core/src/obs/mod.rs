//! Observability: runtime event telemetry for merge, validation, and
//! commit paths, plus storage snapshots.

pub(crate) mod metrics;
pub(crate) mod sink;
pub(crate) mod snapshot;

// re-exports
pub use metrics::{EventReport, metrics_report, metrics_reset};
pub use sink::{
    MergeOutcomeKind, MetricsEvent, MetricsSink, NoopMetricsSink, record, with_metrics_sink,
};
pub use snapshot::{StorageReport, TableReport, storage_report};
