//! Elapsed working time for a single task

use chrono::{DateTime, Utc};

use crate::tracking::duration::{closed_seconds, parse_timestamp};
use crate::tracking::models::{LiveElapsed, Task, WorkSession};

/// The session currently being worked, if any. The last open session in
/// insertion order wins when the data holds more than one.
pub fn open_session(task: &Task) -> Option<&WorkSession> {
    task.sessions.iter().rev().find(|session| session.is_open())
}

/// Whole seconds between the open session's start and `now`, never negative.
pub fn open_seconds(session: &WorkSession, now: DateTime<Utc>) -> Option<u64> {
    let started_at = parse_timestamp(&session.started_at)?;
    Some((now - started_at).num_seconds().max(0) as u64)
}

/// Compute the elapsed working time of `task` as of `now`.
///
/// Closed sessions contribute their recorded duration. While the task is in
/// progress the open session adds the wall-clock time since it started.
pub fn compute_live_elapsed(task: &Task, now: DateTime<Utc>) -> LiveElapsed {
    let closed = closed_seconds(task);

    if !task.is_in_progress() {
        return LiveElapsed::new(closed, false);
    }

    match open_session(task).and_then(|session| open_seconds(session, now)) {
        Some(open) => LiveElapsed::new(closed + open, true),
        None => {
            log::warn!(
                "Task {:?} is in progress without a usable open session, showing closed time only",
                task.name.as_deref().unwrap_or("<unnamed>")
            );
            LiveElapsed {
                open_session_missing: true,
                ..LiveElapsed::new(closed, true)
            }
        }
    }
}
