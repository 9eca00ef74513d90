//! Fabrication work tracking - session timing and efficiency reporting

pub mod tracking;

pub use tracking::{
    aggregate_by_period, aggregate_wbs, compute_live_elapsed, AppConfig, BundleSelection,
    Granularity, LiveElapsed, LiveElapsedTracker, PeriodReport, Task, TaskFilter, WbsCategory,
    WbsReport, WorkSession,
};
