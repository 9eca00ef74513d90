//! Duration extraction, parsing and formatting shared by every calculator

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::tracking::models::{Task, WorkSession};

const SECONDS_PER_HOUR: u64 = 3600;

/// Parse an `H:MM` / `HH:MM` allocation into seconds.
///
/// Hours are unbounded, minutes must be `0..=59`. Anything else is treated
/// as no allocation and yields 0.
pub fn parse_allocated_seconds(raw: &str) -> u64 {
    let trimmed = raw.trim();
    let Some((hours, minutes)) = trimmed.split_once(':') else {
        return 0;
    };

    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(hours) || !is_digits(minutes) || minutes.len() > 2 {
        log::debug!("Ignoring malformed allocation {:?}", raw);
        return 0;
    }

    let (Ok(hours), Ok(minutes)) = (hours.parse::<u64>(), minutes.parse::<u64>()) else {
        return 0;
    };
    if minutes >= 60 {
        log::debug!("Ignoring allocation with out-of-range minutes {:?}", raw);
        return 0;
    }

    hours
        .saturating_mul(SECONDS_PER_HOUR)
        .saturating_add(minutes * 60)
}

/// Allocated seconds of a task; absent or malformed budgets count as 0.
pub fn allocated_seconds(task: &Task) -> u64 {
    task.allocated_duration
        .as_deref()
        .map(parse_allocated_seconds)
        .unwrap_or(0)
}

/// Recorded duration of a closed session. Open sessions contribute nothing
/// here; their time is derived from the clock instead.
pub fn session_seconds(session: &WorkSession) -> u64 {
    if session.is_open() {
        return 0;
    }
    session.duration_seconds.unwrap_or(0).max(0) as u64
}

/// Sum of the recorded durations of all closed sessions.
pub fn closed_seconds(task: &Task) -> u64 {
    task.sessions.iter().map(session_seconds).sum()
}

pub fn seconds_to_hours(seconds: u64) -> f64 {
    seconds as f64 / SECONDS_PER_HOUR as f64
}

/// Render seconds as `HH:MM:SS`. Hours grow past two digits when needed.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Render seconds as `HH:MM`, dropping leftover seconds.
pub fn format_hm(total_seconds: u64) -> String {
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / 60;
    format!("{:02}:{:02}", hours, minutes)
}

/// Parse a session timestamp. RFC 3339 is preferred; naive date-times
/// are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a calendar date, accepting anything [`parse_timestamp`] accepts
/// plus a bare `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw)
        .map(|ts| ts.date_naive())
        .or_else(|| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

/// Date used to place a task on the calendar: due date, then end date,
/// then creation date.
pub fn reference_date(task: &Task) -> Option<NaiveDate> {
    [&task.due_date, &task.end_date, &task.created_at]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find_map(parse_date)
}
