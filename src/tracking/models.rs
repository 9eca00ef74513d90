//! Data models for work-session tracking and aggregation

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tracking::duration::format_hm;

/// Bundle key used for tasks without a bundle identifier
pub const UNGROUPED_BUNDLE: &str = "ungrouped";

/// Lowercase a free-form key and unify `-`/space separators to `_`
fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Lifecycle status of a task as reported by the task API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    /// Paused or on break
    Paused,
    Completed,
    Other,
}

impl TaskStatus {
    pub fn from_key(raw: &str) -> Self {
        match normalize_key(raw).as_str() {
            "not_started" | "notstarted" | "assigned" | "todo" => TaskStatus::NotStarted,
            "in_progress" | "inprogress" | "active" | "running" => TaskStatus::InProgress,
            "paused" | "break" | "on_break" | "on_hold" => TaskStatus::Paused,
            "completed" | "complete" | "done" => TaskStatus::Completed,
            _ => TaskStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Other => "other",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        TaskStatus::from_key(&value)
    }
}

/// Work-breakdown category. The set is closed; unknown keys land in `Other`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum WbsCategory {
    Modelling,
    ModellingChecking,
    Detailing,
    DetailingChecking,
    Erection,
    ErectionChecking,
    #[default]
    Other,
}

impl WbsCategory {
    /// Every category, in display order
    pub const ALL: [WbsCategory; 7] = [
        WbsCategory::Modelling,
        WbsCategory::ModellingChecking,
        WbsCategory::Detailing,
        WbsCategory::DetailingChecking,
        WbsCategory::Erection,
        WbsCategory::ErectionChecking,
        WbsCategory::Other,
    ];

    pub fn from_key(raw: &str) -> Self {
        match normalize_key(raw).as_str() {
            "modelling" | "modeling" => WbsCategory::Modelling,
            "modelling_checking" | "modeling_checking" => WbsCategory::ModellingChecking,
            "detailing" => WbsCategory::Detailing,
            "detailing_checking" => WbsCategory::DetailingChecking,
            "erection" => WbsCategory::Erection,
            "erection_checking" => WbsCategory::ErectionChecking,
            _ => WbsCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WbsCategory::Modelling => "modelling",
            WbsCategory::ModellingChecking => "modelling_checking",
            WbsCategory::Detailing => "detailing",
            WbsCategory::DetailingChecking => "detailing_checking",
            WbsCategory::Erection => "erection",
            WbsCategory::ErectionChecking => "erection_checking",
            WbsCategory::Other => "other",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            WbsCategory::Modelling => "Modelling",
            WbsCategory::ModellingChecking => "Modelling Checking",
            WbsCategory::Detailing => "Detailing",
            WbsCategory::DetailingChecking => "Detailing Checking",
            WbsCategory::Erection => "Erection",
            WbsCategory::ErectionChecking => "Erection Checking",
            WbsCategory::Other => "Other",
        }
    }
}

impl From<String> for WbsCategory {
    fn from(value: String) -> Self {
        WbsCategory::from_key(&value)
    }
}

impl fmt::Display for WbsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field deserializers for task records coming from loosely typed APIs.
///
/// A wrong-typed or null value degrades to "absent" for that field only, so
/// the rest of the record still counts.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{TaskStatus, WorkSession};

    /// Scalars become text, null and containers become `None`
    pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(opt_text(deserializer)?.unwrap_or_default())
    }

    /// Only an explicit null (or missing field) leaves a session open
    pub fn end_marker<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Integers, integral floats and numeric strings
    pub fn seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => TaskStatus::from_key(&s),
            _ => TaskStatus::Other,
        })
    }

    /// Keeps every session that is an object, drops anything else
    pub fn sessions<'de, D>(deserializer: D) -> Result<Vec<WorkSession>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// One contiguous interval of work on a task
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkSession {
    #[serde(
        default,
        alias = "started_at",
        alias = "startTime",
        deserialize_with = "lenient::text"
    )]
    pub started_at: String,
    /// Absent while the session is still running
    #[serde(
        default,
        alias = "ended_at",
        alias = "endTime",
        deserialize_with = "lenient::end_marker"
    )]
    pub ended_at: Option<String>,
    /// Authoritative for closed sessions only
    #[serde(
        default,
        alias = "duration_seconds",
        alias = "duration",
        deserialize_with = "lenient::seconds"
    )]
    pub duration_seconds: Option<i64>,
}

impl WorkSession {
    /// A session is open until an end timestamp is recorded.
    pub fn is_open(&self) -> bool {
        self.ended_at
            .as_deref()
            .map_or(true, |ended| ended.trim().is_empty())
    }
}

/// A trackable unit of work, as supplied by the task API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: TaskStatus,
    #[serde(
        default,
        alias = "workingHourTask",
        alias = "working_sessions",
        deserialize_with = "lenient::sessions"
    )]
    pub sessions: Vec<WorkSession>,
    /// Budget in `H:MM` form
    #[serde(
        default,
        alias = "allocated_duration",
        alias = "duration",
        deserialize_with = "lenient::opt_text"
    )]
    pub allocated_duration: Option<String>,
    #[serde(
        default,
        alias = "project_id",
        alias = "projectId",
        deserialize_with = "lenient::opt_text"
    )]
    pub project: Option<String>,
    #[serde(
        default,
        alias = "work_package",
        alias = "stage",
        deserialize_with = "lenient::opt_text"
    )]
    pub bundle: Option<String>,
    #[serde(
        default,
        alias = "wbs_category",
        alias = "wbsType",
        deserialize_with = "lenient::opt_text"
    )]
    pub category: Option<String>,
    #[serde(default, alias = "due_date", deserialize_with = "lenient::opt_text")]
    pub due_date: Option<String>,
    #[serde(
        default,
        alias = "end_date",
        alias = "completionDate",
        deserialize_with = "lenient::opt_text"
    )]
    pub end_date: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient::opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub assignee: Option<String>,
}

impl Task {
    pub fn is_in_progress(&self) -> bool {
        self.status == TaskStatus::InProgress
    }

    pub fn wbs_category(&self) -> WbsCategory {
        self.category
            .as_deref()
            .map(WbsCategory::from_key)
            .unwrap_or_default()
    }

    /// Bundle identifier, or [`UNGROUPED_BUNDLE`] when missing or blank
    pub fn bundle_key(&self) -> &str {
        match self.bundle.as_deref().map(str::trim) {
            Some(bundle) if !bundle.is_empty() => bundle,
            _ => UNGROUPED_BUNDLE,
        }
    }

    /// Project identifier if present and non-blank
    pub fn project_key(&self) -> Option<&str> {
        self.project
            .as_deref()
            .map(str::trim)
            .filter(|project| !project.is_empty())
    }
}

/// Live elapsed-time value for one task
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveElapsed {
    pub elapsed_seconds: u64,
    /// `HH:MM:SS`
    pub formatted_time: String,
    pub is_active: bool,
    /// Task is in progress but no usable open session was found
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub open_session_missing: bool,
}

impl Default for LiveElapsed {
    fn default() -> Self {
        LiveElapsed::new(0, false)
    }
}

impl LiveElapsed {
    pub fn new(elapsed_seconds: u64, is_active: bool) -> Self {
        Self {
            elapsed_seconds,
            formatted_time: crate::tracking::duration::format_hms(elapsed_seconds),
            is_active,
            open_session_missing: false,
        }
    }
}

/// Calendar granularity for period aggregation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Granularity {
    /// Number of calendar units in the trailing window
    pub fn window_len(&self) -> u32 {
        match self {
            Granularity::Day => 30,
            Granularity::Week => 12,
            Granularity::Month => 12,
            Granularity::Year => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown granularity: {0}")]
pub struct ParseGranularityError(pub String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            "year" | "yearly" => Ok(Granularity::Year),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

/// One calendar period of the trailing window
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub label: String,
    pub period_start: NaiveDate,
    pub task_count: u32,
    pub distinct_project_count: u32,
    pub worked_seconds: u64,
    pub allocated_seconds: u64,
    pub worked_hours: f64,
    pub allocated_hours: f64,
    /// Percentage clamped to the display cap
    pub efficiency: u32,
    /// Unclamped allocated / worked percentage
    pub raw_efficiency: f64,
}

/// Period aggregation output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub granularity: Granularity,
    pub reference_time: DateTime<Utc>,
    /// Oldest first, one per calendar unit
    pub buckets: Vec<TimeBucket>,
    /// Tasks with no parseable due, end or creation date
    pub undated_task_count: u32,
    pub out_of_window_task_count: u32,
}

impl PeriodReport {
    pub fn total_worked_hours(&self) -> f64 {
        self.buckets.iter().map(|b| b.worked_hours).sum()
    }

    pub fn total_allocated_hours(&self) -> f64 {
        self.buckets.iter().map(|b| b.allocated_hours).sum()
    }
}

/// Totals for one (bundle, category) cell or a rollup
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WbsCell {
    pub task_count: u32,
    pub worked_seconds: u64,
    pub allocated_seconds: u64,
}

impl WbsCell {
    pub fn add(&mut self, other: &WbsCell) {
        self.task_count += other.task_count;
        self.worked_seconds += other.worked_seconds;
        self.allocated_seconds += other.allocated_seconds;
    }

    pub fn is_empty(&self) -> bool {
        self.task_count == 0
    }

    pub fn worked_hm(&self) -> String {
        format_hm(self.worked_seconds)
    }

    pub fn allocated_hm(&self) -> String {
        format_hm(self.allocated_seconds)
    }
}

/// Per-bundle breakdown across the fixed category set
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleBreakdown {
    pub bundle: String,
    /// Always holds every [`WbsCategory`]
    pub categories: BTreeMap<WbsCategory, WbsCell>,
    pub totals: WbsCell,
}

impl BundleBreakdown {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            categories: WbsCategory::ALL
                .iter()
                .map(|category| (*category, WbsCell::default()))
                .collect(),
            totals: WbsCell::default(),
        }
    }

    pub fn cell(&self, category: WbsCategory) -> WbsCell {
        self.categories.get(&category).copied().unwrap_or_default()
    }
}

/// Hierarchical aggregation output, keyed by bundle
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WbsReport {
    pub bundles: BTreeMap<String, BundleBreakdown>,
}

impl WbsReport {
    pub fn bundle(&self, key: &str) -> Option<&BundleBreakdown> {
        self.bundles.get(key)
    }

    /// First bundle in key order
    pub fn first_bundle_key(&self) -> Option<&str> {
        self.bundles.keys().next().map(String::as_str)
    }

    /// Grand total across every bundle
    pub fn totals(&self) -> WbsCell {
        let mut totals = WbsCell::default();
        for breakdown in self.bundles.values() {
            totals.add(&breakdown.totals);
        }
        totals
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub default_granularity: Granularity,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            default_granularity: Granularity::default(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}
