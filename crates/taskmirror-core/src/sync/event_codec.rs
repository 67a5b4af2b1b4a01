//! Encoding/decoding between local tasks and remote calendar events.
//!
//! The mapper is pure and stateless. Everything the calendar cannot
//! represent natively (task id, completion, priority, tags, recurrence,
//! estimate, category) rides in the event's private metadata bag, so
//! `task_from_event(task_to_event_payload(t))` is a fixed point for every
//! bag-preserved field. The task id in particular round-trips via the bag,
//! never via the remote event id.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::sync::types::{
    EventStatus, EventTime, RemoteEvent, SyncError, APP_MARKER, META_APP, META_CATEGORY,
    META_COMPLETED, META_ESTIMATE, META_PRIORITY, META_RECURRENCE, META_TAGS, META_TASK_ID,
};
use crate::task::{Priority, Recurrence, Task};

/// Event duration assumed when a task has no estimate.
const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Timezone name sent with timed events. Due times are timezone-naive
/// locally, so they are pinned to UTC on the wire.
const WIRE_TIME_ZONE: &str = "UTC";

const COLOR_HIGH: &str = "11";
const COLOR_NORMAL: &str = "6";
const COLOR_LOW: &str = "10";
/// Muted hint for completed tasks, overriding the priority color.
const COLOR_COMPLETED: &str = "8";

/// Build the wire payload for a task's remote event.
pub fn task_to_event_payload(task: &Task) -> Value {
    let mut payload = json!({
        "summary": task.title,
        "description": task.description,
        "colorId": color_hint(task),
        "extendedProperties": {
            "private": {
                META_APP: APP_MARKER,
                META_TASK_ID: task.id,
                META_COMPLETED: task.completed.to_string(),
                META_PRIORITY: task.priority.as_str(),
                META_TAGS: serde_json::to_string(&task.tags).unwrap_or_else(|_| "[]".into()),
                META_RECURRENCE: task.recurrence.as_str(),
                META_ESTIMATE: task.estimate_minutes.to_string(),
                META_CATEGORY: task.category.clone().unwrap_or_default(),
            }
        }
    });

    if let Some(due_date) = task.due_date {
        if let Some(due_time) = task.due_time {
            let start = NaiveDateTime::new(due_date, due_time).and_utc();
            let end = start + Duration::minutes(effective_estimate(task.estimate_minutes) as i64);
            payload["start"] = json!({
                "dateTime": start.to_rfc3339(),
                "timeZone": WIRE_TIME_ZONE,
            });
            payload["end"] = json!({
                "dateTime": end.to_rfc3339(),
                "timeZone": WIRE_TIME_ZONE,
            });
        } else {
            // All-day events use an exclusive end date.
            payload["start"] = json!({ "date": due_date.to_string() });
            payload["end"] = json!({ "date": (due_date + Duration::days(1)).to_string() });
        }
    }

    payload
}

/// Rebuild a task from a fetched remote event.
///
/// Missing metadata falls back to task defaults; malformed tag JSON yields
/// an empty list. When the bag lacks an estimate and the event is timed,
/// the estimate is derived from the event duration.
pub fn task_from_event(event: &RemoteEvent) -> Task {
    let id = event
        .metadata
        .get(META_TASK_ID)
        .cloned()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut task = Task::new(id, if event.summary.is_empty() {
        "Untitled".to_string()
    } else {
        event.summary.clone()
    });
    task.description = event.description.clone();
    task.synced = true;
    task.remote_event_id = Some(event.id.clone());
    if let Some(updated) = event.updated {
        task.last_modified = updated;
    }

    if let Some(completed) = event.metadata.get(META_COMPLETED) {
        task.completed = completed == "true";
    }
    task.priority = match event.metadata.get(META_PRIORITY) {
        Some(p) => Priority::parse(p),
        None => priority_from_color(event.color_id.as_deref()),
    };
    if let Some(tags) = event.metadata.get(META_TAGS) {
        task.tags = serde_json::from_str(tags).unwrap_or_default();
    }
    if let Some(recurrence) = event.metadata.get(META_RECURRENCE) {
        task.recurrence = Recurrence::parse(recurrence);
    }
    if let Some(category) = event.metadata.get(META_CATEGORY) {
        if !category.is_empty() {
            task.category = Some(category.clone());
        }
    }

    match event.metadata.get(META_ESTIMATE).and_then(|e| e.parse().ok()) {
        Some(estimate) => task.estimate_minutes = estimate,
        None => {
            if let (Some(start), Some(end)) = (
                event.start.as_ref().and_then(EventTime::date_time),
                event.end.as_ref().and_then(EventTime::date_time),
            ) {
                let seconds = (end - start).num_seconds();
                task.estimate_minutes = ((seconds as f64) / 60.0).round().max(0.0) as u32;
            }
        }
    }

    match &event.start {
        Some(EventTime::Timed { date_time, .. }) => {
            task.due_date = Some(date_time.date_naive());
            task.due_time = Some(date_time.time());
        }
        Some(EventTime::AllDay(date)) => {
            task.due_date = Some(*date);
            task.due_time = None;
        }
        None => {}
    }

    task
}

/// Overwrite a local task in place from its (newer) remote event.
///
/// Same field transform as `task_from_event` but preserves the task's
/// identity and creation time; stamps `last_modified` with the event's
/// update time so reclassification sees the pair as converged.
pub fn merge_event_into_task(task: &mut Task, event: &RemoteEvent) {
    let incoming = task_from_event(event);
    task.title = incoming.title;
    task.description = incoming.description;
    task.completed = incoming.completed;
    task.due_date = incoming.due_date;
    task.due_time = incoming.due_time;
    task.priority = incoming.priority;
    task.category = incoming.category;
    task.tags = incoming.tags;
    task.estimate_minutes = incoming.estimate_minutes;
    task.recurrence = incoming.recurrence;
    task.synced = true;
    task.remote_event_id = Some(event.id.clone());
    task.last_modified = event.updated.unwrap_or_else(Utc::now);
}

/// Parse a calendar API event resource into a [`RemoteEvent`].
pub fn parse_remote_event(raw: &Value) -> Result<RemoteEvent, SyncError> {
    let id = raw["id"]
        .as_str()
        .ok_or_else(|| SyncError::CalendarApi("event missing id".into()))?
        .to_string();

    let status = match raw["status"].as_str() {
        Some("cancelled") => EventStatus::Cancelled,
        _ => EventStatus::Confirmed,
    };

    let updated = raw["updated"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut metadata = BTreeMap::new();
    if let Some(private) = raw["extendedProperties"]["private"].as_object() {
        for (key, value) in private {
            if let Some(value) = value.as_str() {
                metadata.insert(key.clone(), value.to_string());
            }
        }
    }

    Ok(RemoteEvent {
        id,
        summary: raw["summary"].as_str().unwrap_or_default().to_string(),
        description: raw["description"].as_str().unwrap_or_default().to_string(),
        start: parse_event_time(&raw["start"]),
        end: parse_event_time(&raw["end"]),
        updated,
        status,
        color_id: raw["colorId"].as_str().map(|s| s.to_string()),
        metadata,
    })
}

fn parse_event_time(raw: &Value) -> Option<EventTime> {
    if let Some(date_time) = raw["dateTime"].as_str() {
        let date_time = DateTime::parse_from_rfc3339(date_time)
            .ok()?
            .with_timezone(&Utc);
        return Some(EventTime::Timed {
            date_time,
            time_zone: raw["timeZone"].as_str().map(|s| s.to_string()),
        });
    }
    if let Some(date) = raw["date"].as_str() {
        return date.parse().ok().map(EventTime::AllDay);
    }
    None
}

fn effective_estimate(estimate_minutes: u32) -> u32 {
    if estimate_minutes == 0 {
        DEFAULT_DURATION_MINUTES
    } else {
        estimate_minutes
    }
}

fn color_hint(task: &Task) -> &'static str {
    if task.completed {
        return COLOR_COMPLETED;
    }
    match task.priority {
        Priority::High => COLOR_HIGH,
        Priority::Normal => COLOR_NORMAL,
        Priority::Low => COLOR_LOW,
    }
}

fn priority_from_color(color_id: Option<&str>) -> Priority {
    match color_id {
        Some(COLOR_HIGH) => Priority::High,
        Some(COLOR_LOW) => Priority::Low,
        _ => Priority::Normal,
    }
}
