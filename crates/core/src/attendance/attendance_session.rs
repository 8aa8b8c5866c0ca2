use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use serde::Serialize;

/// A person recorded as present.
///
/// Ordering is by name, then group, which is the order reports list them in.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Attendee {
    pub name: String,
    pub group: String,
}

/// Everything resolved during one run, plus what the run was for.
#[derive(Clone, Debug)]
pub struct AttendanceSession {
    subject: Option<String>,
    group: Option<String>,
    started_at: DateTime<Local>,
    attendees: BTreeSet<Attendee>,
}

impl AttendanceSession {
    pub fn new() -> Self {
        Self {
            subject: None,
            group: None,
            started_at: Local::now(),
            attendees: BTreeSet::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Returns `true` the first time a `(name, group)` pair is seen.
    pub fn record(&mut self, name: &str, group: &str) -> bool {
        let inserted = self.attendees.insert(Attendee {
            name: name.to_string(),
            group: group.to_string(),
        });
        if inserted {
            log::info!("Recorded attendance: {name} ({group})");
        }
        inserted
    }

    pub fn contains(&self, name: &str, group: &str) -> bool {
        self.attendees.contains(&Attendee {
            name: name.to_string(),
            group: group.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attendees.is_empty()
    }

    /// Attendees sorted by name, then group.
    pub fn list(&self) -> Vec<&Attendee> {
        self.attendees.iter().collect()
    }

    /// Starts over for a new session; the session info is kept.
    pub fn clear(&mut self) {
        self.attendees.clear();
    }
}

impl Default for AttendanceSession {
    fn default() -> Self {
        Self::new()
    }
}
