//! Local task model.
//!
//! A [`Task`] is the authoritative local record. The sync engine mirrors
//! tasks marked `synced` into the remote calendar and stores the resulting
//! event id in `remote_event_id`; that pair of fields plus `last_modified`
//! is the only durable sync state.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Wire representation used in the event metadata bag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Parse from the wire representation, defaulting to Normal.
    pub fn parse(s: &str) -> Priority {
        match s {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence rule for repeating tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Default for Recurrence {
    fn default() -> Self {
        Recurrence::None
    }
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Recurrence {
        match s {
            "daily" => Recurrence::Daily,
            "weekly" => Recurrence::Weekly,
            "monthly" => Recurrence::Monthly,
            _ => Recurrence::None,
        }
    }
}

/// A local to-do item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Stable caller-assigned identifier.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Calendar date the task is due, if any.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Time of day the task is due, timezone-naive. Only meaningful
    /// together with `due_date`.
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    /// Ordered list with set semantics.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Estimated duration in minutes. Zero means unestimated.
    #[serde(default)]
    pub estimate_minutes: u32,
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Whether this task should be mirrored to the remote calendar.
    #[serde(default)]
    pub synced: bool,
    /// Id of the mirrored remote event, once one exists.
    #[serde(default)]
    pub remote_event_id: Option<String>,
}

impl Task {
    /// Create a task with defaults, stamped with the current time.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            completed: false,
            created_at: now,
            last_modified: now,
            due_date: None,
            due_time: None,
            priority: Priority::Normal,
            category: None,
            tags: Vec::new(),
            estimate_minutes: 0,
            recurrence: Recurrence::None,
            synced: false,
            remote_event_id: None,
        }
    }

    /// Stamp the task as modified now.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Drop the link to the remote event without touching `last_modified`.
    ///
    /// Used when the remote side cancelled the event and the local copy
    /// has no divergent edits; the task simply stops being mirrored.
    pub fn unsync(&mut self) {
        self.synced = false;
        self.remote_event_id = None;
    }

    /// Next due date if this task recurs, based on the current due date.
    ///
    /// Monthly recurrence clamps to the last valid day of the shorter
    /// month (Jan 31 -> Feb 28).
    pub fn next_occurrence(&self) -> Option<NaiveDate> {
        let due = self.due_date?;
        match self.recurrence {
            Recurrence::None => None,
            Recurrence::Daily => Some(due + Duration::days(1)),
            Recurrence::Weekly => Some(due + Duration::days(7)),
            Recurrence::Monthly => {
                let (year, month) = if due.month() == 12 {
                    (due.year() + 1, 1)
                } else {
                    (due.year(), due.month() + 1)
                };
                let mut day = due.day();
                loop {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                        return Some(date);
                    }
                    day -= 1;
                }
            }
        }
    }
}
