//! Calendar-period aggregation of allocated vs worked time

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use crate::tracking::duration::{
    allocated_seconds, closed_seconds, reference_date, seconds_to_hours,
};
use crate::tracking::models::{Granularity, PeriodReport, Task, TaskStatus, TimeBucket};

/// Efficiency values above this are clamped for display
pub const EFFICIENCY_DISPLAY_CAP: u32 = 200;

/// Filter options for task collections
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    /// Filter by project identifier
    pub project: Option<String>,
    /// Filter by assignee
    pub assignee: Option<String>,
    /// Filter by status
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = project;
        self
    }

    pub fn with_assignee(mut self, assignee: Option<String>) -> Self {
        self.assignee = assignee;
        self
    }

    pub fn with_status(mut self, status: Option<TaskStatus>) -> Self {
        self.status = status;
        self
    }

    /// Check if a task passes the filter
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project) = &self.project {
            if task.project_key() != Some(project.as_str()) {
                return false;
            }
        }

        if let Some(assignee) = &self.assignee {
            if task.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }

        true
    }
}

/// Efficiency percentage of allocated over worked time.
///
/// Returns `(display, raw)`: the display value is rounded and clamped to
/// [`EFFICIENCY_DISPLAY_CAP`], the raw value is unclamped. Both are 0 when
/// no work was logged, whatever the allocation.
pub fn efficiency(allocated_seconds: u64, worked_seconds: u64) -> (u32, f64) {
    if worked_seconds == 0 {
        return (0, 0.0);
    }

    let raw = allocated_seconds as f64 / worked_seconds as f64 * 100.0;
    let display = raw.round().min(EFFICIENCY_DISPLAY_CAP as f64) as u32;
    (display, (raw * 100.0).round() / 100.0)
}

/// First day of the calendar unit containing `date`. Weeks start on Monday.
///
/// `None` when that day falls outside the representable calendar.
pub fn period_start(date: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => Some(date),
        Granularity::Week => date.checked_sub_signed(Duration::days(
            date.weekday().num_days_from_monday() as i64,
        )),
        Granularity::Month => date.with_day(1),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    }
}

/// Start of the unit `units_back` units before the one starting at `current`
fn step_back(current: NaiveDate, granularity: Granularity, units_back: u32) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => current.checked_sub_signed(Duration::days(units_back as i64)),
        Granularity::Week => current.checked_sub_signed(Duration::weeks(units_back as i64)),
        Granularity::Month => current.checked_sub_months(Months::new(units_back)),
        Granularity::Year => NaiveDate::from_ymd_opt(current.year() - units_back as i32, 1, 1),
    }
}

pub fn period_label(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => start.format("%Y-%m-%d").to_string(),
        Granularity::Week => start.format("%G-W%V").to_string(),
        Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Year => start.format("%Y").to_string(),
    }
}

/// Period starts of the trailing window ending at `reference`, oldest first
pub fn window_starts(reference: NaiveDate, granularity: Granularity) -> Vec<NaiveDate> {
    let Some(current) = period_start(reference, granularity) else {
        return Vec::new();
    };
    (0..granularity.window_len())
        .rev()
        .filter_map(|units_back| step_back(current, granularity, units_back))
        .collect()
}

/// Accumulator for one bucket
#[derive(Default)]
struct BucketAccumulator {
    task_count: u32,
    projects: HashSet<String>,
    worked_seconds: u64,
    allocated_seconds: u64,
}

impl BucketAccumulator {
    fn add_task(&mut self, task: &Task) {
        self.task_count += 1;
        self.worked_seconds += closed_seconds(task);
        self.allocated_seconds += allocated_seconds(task);
        if let Some(project) = task.project_key() {
            self.projects.insert(project.to_string());
        }
    }

    fn into_bucket(self, start: NaiveDate, granularity: Granularity) -> TimeBucket {
        let (efficiency, raw_efficiency) = efficiency(self.allocated_seconds, self.worked_seconds);
        TimeBucket {
            label: period_label(start, granularity),
            period_start: start,
            task_count: self.task_count,
            distinct_project_count: self.projects.len() as u32,
            worked_seconds: self.worked_seconds,
            allocated_seconds: self.allocated_seconds,
            worked_hours: seconds_to_hours(self.worked_seconds),
            allocated_hours: seconds_to_hours(self.allocated_seconds),
            efficiency,
            raw_efficiency,
        }
    }
}

/// Group tasks into the trailing calendar window ending at `reference_time`.
///
/// Every unit of the window is present, oldest first, even when empty.
/// Tasks dated outside the window or without any usable date are counted
/// on the report but contribute to no bucket.
pub fn aggregate_by_period<'a, I>(
    tasks: I,
    granularity: Granularity,
    reference_time: DateTime<Utc>,
) -> PeriodReport
where
    I: IntoIterator<Item = &'a Task>,
{
    let starts = window_starts(reference_time.date_naive(), granularity);
    let index: HashMap<NaiveDate, usize> = starts
        .iter()
        .enumerate()
        .map(|(i, start)| (*start, i))
        .collect();

    let mut accumulators: Vec<BucketAccumulator> =
        starts.iter().map(|_| BucketAccumulator::default()).collect();
    let mut undated_task_count = 0;
    let mut out_of_window_task_count = 0;

    for task in tasks {
        let Some(date) = reference_date(task) else {
            undated_task_count += 1;
            continue;
        };

        match period_start(date, granularity).and_then(|start| index.get(&start)) {
            Some(&i) => accumulators[i].add_task(task),
            None => out_of_window_task_count += 1,
        }
    }

    let buckets: Vec<TimeBucket> = accumulators
        .into_iter()
        .zip(starts)
        .map(|(acc, start)| acc.into_bucket(start, granularity))
        .collect();

    log::debug!(
        "Aggregated {} {} buckets ({} undated, {} outside window)",
        buckets.len(),
        granularity,
        undated_task_count,
        out_of_window_task_count
    );

    PeriodReport {
        granularity,
        reference_time,
        buckets,
        undated_task_count,
        out_of_window_task_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::models::WorkSession;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 15, 30, 0).unwrap()
    }

    fn task(due: &str, allocated: &str, worked: &[i64], project: &str) -> Task {
        Task {
            status: TaskStatus::Completed,
            due_date: Some(due.to_string()),
            allocated_duration: Some(allocated.to_string()),
            project: Some(project.to_string()),
            sessions: worked
                .iter()
                .map(|seconds| WorkSession {
                    started_at: "2026-10-01T08:00:00Z".to_string(),
                    ended_at: Some("2026-10-01T09:00:00Z".to_string()),
                    duration_seconds: Some(*seconds),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_efficiency_rules() {
        assert_eq!(efficiency(7200, 3600), (200, 200.0));
        assert_eq!(efficiency(3600, 3600), (100, 100.0));
        assert_eq!(efficiency(3600, 7200), (50, 50.0));
        assert_eq!(efficiency(36_000, 3600), (200, 1000.0));
        assert_eq!(efficiency(7200, 0), (0, 0.0));
        assert_eq!(efficiency(0, 0), (0, 0.0));
        assert_eq!(efficiency(0, 3600), (0, 0.0));
    }

    #[test]
    fn test_window_shapes() {
        let today = reference().date_naive();

        let days = window_starts(today, Granularity::Day);
        assert_eq!(days.len(), 30);
        assert_eq!(days.last(), Some(&today));
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 9, 19).unwrap());

        let weeks = window_starts(today, Granularity::Week);
        assert_eq!(weeks.len(), 12);
        // 2026-10-18 is a Sunday, its ISO week starts Monday the 12th
        assert_eq!(weeks.last(), NaiveDate::from_ymd_opt(2026, 10, 12).as_ref());

        let months = window_starts(today, Granularity::Month);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(months[11], NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());

        let years = window_starts(today, Granularity::Year);
        assert_eq!(
            years.iter().map(|d| d.year()).collect::<Vec<_>>(),
            vec![2022, 2023, 2024, 2025, 2026]
        );
    }

    #[test]
    fn test_labels() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(period_label(monday, Granularity::Day), "2026-10-12");
        assert_eq!(period_label(monday, Granularity::Week), "2026-W42");
        assert_eq!(period_label(monday, Granularity::Month), "2026-10");
        assert_eq!(period_label(monday, Granularity::Year), "2026");
    }

    #[test]
    fn test_empty_input_keeps_every_bucket() {
        let tasks: Vec<Task> = Vec::new();
        for granularity in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Year,
        ] {
            let report = aggregate_by_period(&tasks, granularity, reference());
            assert_eq!(report.buckets.len(), granularity.window_len() as usize);
            assert!(report
                .buckets
                .iter()
                .all(|b| b.task_count == 0 && b.efficiency == 0 && b.worked_hours == 0.0));
            assert_eq!(
                report.buckets.iter().map(|b| b.period_start).collect::<Vec<_>>(),
                window_starts(reference().date_naive(), granularity)
            );
        }
    }

    #[test]
    fn test_allocated_without_work_has_zero_efficiency() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| task(&format!("2026-10-{:02}", i + 1), "2:00", &[], "P-1"))
            .collect();

        let report = aggregate_by_period(&tasks, Granularity::Month, reference());
        let current = report.buckets.last().unwrap();
        assert_eq!(current.label, "2026-10");
        assert_eq!(current.task_count, 10);
        assert_eq!(current.allocated_hours, 20.0);
        assert_eq!(current.worked_hours, 0.0);
        assert_eq!(current.efficiency, 0);
    }

    #[test]
    fn test_bucket_totals_and_projects() {
        let tasks = vec![
            task("2026-10-05", "1:30", &[1800, 1800], "P-1"),
            task("2026-10-20", "0:30", &[3600], "P-2"),
            task("2026-10-07T10:00:00Z", "bad", &[900], "P-1"),
            task("2026-09-15", "9:00", &[7200], "P-3"),
        ];

        let report = aggregate_by_period(&tasks, Granularity::Month, reference());
        let october = &report.buckets[11];
        assert_eq!(october.task_count, 3);
        assert_eq!(october.distinct_project_count, 2);
        assert_eq!(october.worked_seconds, 8100);
        assert_eq!(october.allocated_seconds, 7200);
        assert_eq!(october.efficiency, 89);

        let september = &report.buckets[10];
        assert_eq!(september.label, "2026-09");
        assert_eq!(september.efficiency, 200);
        assert_eq!(september.raw_efficiency, 450.0);
        assert_eq!(september.allocated_hours, 9.0);
    }

    #[test]
    fn test_worked_hours_are_additive_inside_window() {
        let tasks = vec![
            task("2026-10-18", "1:00", &[1200], "P-1"),
            task("2026-10-10", "1:00", &[2400, 600], "P-1"),
            task("2026-09-25", "1:00", &[5400], "P-2"),
            task("2026-09-20", "1:00", &[333], "P-3"),
        ];
        let expected: f64 = tasks.iter().map(|t| closed_seconds(t) as f64 / 3600.0).sum();

        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let report = aggregate_by_period(&tasks, granularity, reference());
            assert_eq!(report.out_of_window_task_count, 0);
            assert!((report.total_worked_hours() - expected).abs() < 1e-9);
        }

        let mut yearly_tasks = tasks.clone();
        yearly_tasks.push(task("2023-06-30", "1:00", &[4500], "P-4"));
        let yearly_expected = expected + 4500.0 / 3600.0;

        let report = aggregate_by_period(&yearly_tasks, Granularity::Year, reference());
        assert_eq!(report.out_of_window_task_count, 0);
        assert_eq!(report.buckets[1].label, "2023");
        assert_eq!(report.buckets[1].worked_seconds, 4500);
        assert!((report.total_worked_hours() - yearly_expected).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_dates_fall_outside_window() {
        let tasks = vec![
            task("-262143-01-01", "1:00", &[60], "P-1"),
            task("+262142-12-31", "1:00", &[60], "P-1"),
            task("2026-10-18", "1:00", &[60], "P-1"),
        ];

        for granularity in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Year,
        ] {
            let report = aggregate_by_period(&tasks, granularity, reference());
            assert_eq!(report.out_of_window_task_count, 2);
            assert_eq!(report.buckets.iter().map(|b| b.task_count).sum::<u32>(), 1);
        }
    }

    #[test]
    fn test_period_start_at_calendar_edge() {
        let first_day = NaiveDate::MIN;
        assert_eq!(period_start(first_day, Granularity::Day), Some(first_day));
        assert!(period_start(first_day, Granularity::Week).map_or(true, |d| d == first_day));
        assert!(window_starts(first_day, Granularity::Week).len() <= 12);
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(period_start(sunday, Granularity::Week), Some(monday));
    }

    #[test]
    fn test_undated_and_out_of_window_are_counted() {
        let mut undated = task("x", "1:00", &[60], "P-1");
        undated.due_date = None;
        let tasks = vec![
            undated,
            task("2019-01-01", "1:00", &[60], "P-1"),
            task("2026-10-18", "1:00", &[60], "P-1"),
        ];

        let report = aggregate_by_period(&tasks, Granularity::Year, reference());
        assert_eq!(report.undated_task_count, 1);
        assert_eq!(report.out_of_window_task_count, 1);
        assert_eq!(report.buckets.iter().map(|b| b.task_count).sum::<u32>(), 1);
    }

    #[test]
    fn test_week_boundary_uses_monday_start() {
        let tasks = vec![
            task("2026-10-11", "1:00", &[], "P-1"), // Sunday, previous week
            task("2026-10-12", "1:00", &[], "P-1"), // Monday
        ];
        let report = aggregate_by_period(&tasks, Granularity::Week, reference());
        assert_eq!(report.buckets[11].task_count, 1);
        assert_eq!(report.buckets[10].task_count, 1);
    }

    #[test]
    fn test_filter_narrows_input() {
        let mut mine = task("2026-10-18", "1:00", &[600], "P-1");
        mine.assignee = Some("dana".to_string());
        let other = task("2026-10-18", "1:00", &[600], "P-2");
        let tasks = vec![mine, other];

        let filter = TaskFilter::new().with_assignee(Some("dana".to_string()));
        let report = aggregate_by_period(
            tasks.iter().filter(|t| filter.matches(t)),
            Granularity::Day,
            reference(),
        );
        assert_eq!(report.buckets.last().unwrap().task_count, 1);

        let by_project = TaskFilter::new().with_project(Some("P-2".to_string()));
        assert_eq!(tasks.iter().filter(|t| by_project.matches(t)).count(), 1);
    }
}
