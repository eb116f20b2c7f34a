//! Archive of completed notification events.
//!
//! Append-only except for retention purges. Archived events are terminal and
//! never re-mutated.

use chrono::{DateTime, Duration, Utc};
use depot_store::{mutate_jsonl, read_records_or_empty};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::event::{EventStatus, NotificationEvent};
use crate::queue::QueueError;

/// Query over archived events. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_to: Option<DateTime<Utc>>,
}

impl NotificationFilter {
    pub fn matches(&self, event: &NotificationEvent) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().is_none_or(|expected| expected == actual)
        }

        field(&self.group_id, &event.group_id)
            && field(&self.artifact_id, &event.artifact_id)
            && field(&self.version_id, &event.version_id)
            && field(&self.event_id, &event.event_id)
            && self
                .parent_event_id
                .as_deref()
                .is_none_or(|parent| event.parent_event_id.as_deref() == Some(parent))
            && self
                .success
                .is_none_or(|success| (event.status == EventStatus::Success) == success)
            && self
                .completed_from
                .is_none_or(|from| event.completed.is_some_and(|at| at >= from))
            && self
                .completed_to
                .is_none_or(|to| event.completed.is_some_and(|at| at <= to))
    }
}

pub trait NotificationArchive: Send + Sync {
    fn archive(&self, event: NotificationEvent) -> Result<(), QueueError>;

    /// Matching events in archive order.
    fn find(&self, filter: &NotificationFilter) -> Result<Vec<NotificationEvent>, QueueError>;

    fn get(&self, event_id: &str) -> Result<Option<NotificationEvent>, QueueError> {
        let filter = NotificationFilter {
            event_id: Some(event_id.to_string()),
            ..NotificationFilter::default()
        };
        Ok(self.find(&filter)?.into_iter().next())
    }

    /// Remove events completed strictly before `cutoff`; returns the count.
    fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<usize, QueueError>;

    /// Purge events completed more than `days` ago. A window reaching past
    /// the representable time range purges nothing.
    fn delete_old_notifications(&self, days: i64) -> Result<usize, QueueError> {
        let cutoff = Duration::try_days(days).and_then(|age| Utc::now().checked_sub_signed(age));
        match cutoff {
            Some(cutoff) => self.delete_completed_before(cutoff),
            None => {
                tracing::debug!(days, "retention window out of range; nothing purged");
                Ok(0)
            }
        }
    }
}

fn completed_before(event: &NotificationEvent, cutoff: DateTime<Utc>) -> bool {
    event.completed.is_some_and(|completed| completed < cutoff)
}

#[derive(Debug, Default)]
pub struct MemoryArchive {
    events: Mutex<Vec<NotificationEvent>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationArchive for MemoryArchive {
    fn archive(&self, event: NotificationEvent) -> Result<(), QueueError> {
        self.events
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .push(event);
        Ok(())
    }

    fn find(&self, filter: &NotificationFilter) -> Result<Vec<NotificationEvent>, QueueError> {
        Ok(self
            .events
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }

    fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut events = self.events.lock().map_err(|_| QueueError::Poisoned)?;
        let before = events.len();
        events.retain(|event| !completed_before(event, cutoff));
        Ok(before - events.len())
    }
}

#[derive(Debug, Clone)]
pub struct JsonlArchive {
    path: PathBuf,
}

impl JsonlArchive {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationArchive for JsonlArchive {
    fn archive(&self, event: NotificationEvent) -> Result<(), QueueError> {
        mutate_jsonl::<NotificationEvent, _, Infallible, _>(&self.path, |events| {
            events.push(event);
            Ok(((), true))
        })?;
        Ok(())
    }

    fn find(&self, filter: &NotificationFilter) -> Result<Vec<NotificationEvent>, QueueError> {
        let events: Vec<NotificationEvent> = read_records_or_empty(&self.path)?;
        Ok(events
            .into_iter()
            .filter(|event| filter.matches(event))
            .collect())
    }

    fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<usize, QueueError> {
        let removed = mutate_jsonl::<NotificationEvent, _, Infallible, _>(&self.path, |events| {
            let before = events.len();
            events.retain(|event| !completed_before(event, cutoff));
            let removed = before - events.len();
            Ok((removed, removed > 0))
        })?;
        if removed > 0 {
            tracing::info!(removed, %cutoff, path = %self.path.display(), "archive purged");
        }
        Ok(removed)
    }
}
