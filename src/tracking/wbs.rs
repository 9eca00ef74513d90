//! Bundle / category (work-breakdown) aggregation

use crate::tracking::duration::{allocated_seconds, closed_seconds};
use crate::tracking::models::{BundleBreakdown, Task, WbsCell, WbsReport};

/// Group tasks by bundle, then by category.
///
/// Each bundle lists every category, empty ones included, and carries a
/// rollup across its categories. Tasks without a bundle are grouped under
/// [`UNGROUPED_BUNDLE`](crate::tracking::models::UNGROUPED_BUNDLE); unknown
/// categories count as `Other`.
pub fn aggregate_wbs<'a, I>(tasks: I) -> WbsReport
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut report = WbsReport::default();

    for task in tasks {
        let contribution = WbsCell {
            task_count: 1,
            worked_seconds: closed_seconds(task),
            allocated_seconds: allocated_seconds(task),
        };

        let bundle_key = task.bundle_key();
        let breakdown = report
            .bundles
            .entry(bundle_key.to_string())
            .or_insert_with(|| BundleBreakdown::new(bundle_key));

        breakdown
            .categories
            .entry(task.wbs_category())
            .or_default()
            .add(&contribution);
        breakdown.totals.add(&contribution);
    }

    log::debug!("Aggregated WBS report over {} bundles", report.bundles.len());
    report
}

/// Which bundle the consumer is looking at.
///
/// Defaults to the first bundle in key order and falls back to it again
/// when the selected bundle disappears from a newer report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSelection {
    selected: Option<String>,
}

impl BundleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select `bundle` if the report contains it. Returns whether the
    /// selection changed to it.
    pub fn select(&mut self, report: &WbsReport, bundle: &str) -> bool {
        if report.bundle(bundle).is_none() {
            log::debug!("Ignoring selection of unknown bundle {:?}", bundle);
            return false;
        }
        self.selected = Some(bundle.to_string());
        true
    }

    /// Bring the selection in line with a freshly computed report.
    pub fn reconcile(&mut self, report: &WbsReport) {
        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|bundle| report.bundle(bundle).is_some());

        if !still_present {
            self.selected = report.first_bundle_key().map(str::to_string);
        }
    }

    /// Breakdown for the current selection, reconciling first.
    pub fn current<'r>(&mut self, report: &'r WbsReport) -> Option<&'r BundleBreakdown> {
        self.reconcile(report);
        self.selected
            .as_deref()
            .and_then(|bundle| report.bundle(bundle))
    }
}
