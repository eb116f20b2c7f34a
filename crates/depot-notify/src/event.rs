//! Notification events and responses.
//!
//! An event is the unit of queued refresh work. Every attempt produces a new
//! event value: `begin_attempt`, `with_response` and `complete` consume the
//! previous value instead of mutating a shared one.

use chrono::{DateTime, Utc};
use depot_kernel::{Coordinate, ProjectVersion};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Messages and errors produced by one handling attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl NotificationResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            messages: Vec::new(),
            errors,
        }
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default)]
    pub full_update: bool,
    #[serde(default)]
    pub transitive: bool,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_response: Option<NotificationResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<NotificationResponse>,
    #[serde(default)]
    pub status: EventStatus,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl NotificationEvent {
    /// A fresh pending event for `version` with a new v4 id.
    pub fn new(project_id: impl Into<String>, version: &ProjectVersion) -> Self {
        Self {
            project_id: project_id.into(),
            group_id: version.group_id.clone(),
            artifact_id: version.artifact_id.clone(),
            version_id: version.version_id.clone(),
            full_update: false,
            transitive: false,
            event_id: uuid::Uuid::new_v4().to_string(),
            parent_event_id: None,
            priority: Priority::Normal,
            attempt: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            created: Utc::now(),
            completed: None,
            current_response: None,
            responses: Vec::new(),
            status: EventStatus::Pending,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_full_update(mut self, full_update: bool) -> Self {
        self.full_update = full_update;
        self
    }

    pub fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_parent(mut self, parent_event_id: impl Into<String>) -> Self {
        self.parent_event_id = Some(parent_event_id.into());
        self
    }

    pub fn version(&self) -> ProjectVersion {
        ProjectVersion::new(&self.group_id, &self.artifact_id, &self.version_id)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id)
    }

    pub fn is_snapshot(&self) -> bool {
        depot_kernel::is_snapshot_version(&self.version_id)
    }

    pub fn attempts_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// The value handled by the next attempt.
    pub fn begin_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }

    /// Record `response` as the current one and append it to the history.
    pub fn with_response(mut self, response: NotificationResponse) -> Self {
        self.responses.push(response.clone());
        self.current_response = Some(response);
        self
    }

    /// Terminal value for the archive.
    pub fn complete(self, response: NotificationResponse, completed: DateTime<Utc>) -> Self {
        let status = if response.has_errors() {
            EventStatus::Failed
        } else {
            EventStatus::Success
        };
        let mut event = self.with_response(response);
        event.status = status;
        event.completed = Some(completed);
        event
    }
}
