//! FIFO queue of pending notification events.
//!
//! Multi-producer, single-consumer. `get_first_in_queue` is an atomic
//! peek-and-remove of the oldest event.

use depot_store::{AtomicStoreMutationError, JsonlError, mutate_jsonl, read_records_or_empty};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::event::NotificationEvent;

/// Persistence failures of the queue and the archive.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("notification storage error: {0}")]
    Storage(String),

    #[error("notification state poisoned")]
    Poisoned,
}

impl From<JsonlError> for QueueError {
    fn from(err: JsonlError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<AtomicStoreMutationError<Infallible>> for QueueError {
    fn from(err: AtomicStoreMutationError<Infallible>) -> Self {
        Self::Storage(err.to_string())
    }
}

pub trait NotificationQueue: Send + Sync {
    /// Append `event` at the tail and return its id.
    fn push(&self, event: NotificationEvent) -> Result<String, QueueError>;

    fn size(&self) -> Result<usize, QueueError>;

    /// Remove and return the oldest event.
    fn get_first_in_queue(&self) -> Result<Option<NotificationEvent>, QueueError>;

    /// Every queued event, oldest first.
    fn get_all(&self) -> Result<Vec<NotificationEvent>, QueueError>;
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    events: Mutex<VecDeque<NotificationEvent>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationQueue for MemoryQueue {
    fn push(&self, event: NotificationEvent) -> Result<String, QueueError> {
        let event_id = event.event_id.clone();
        self.events
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .push_back(event);
        Ok(event_id)
    }

    fn size(&self) -> Result<usize, QueueError> {
        Ok(self.events.lock().map_err(|_| QueueError::Poisoned)?.len())
    }

    fn get_first_in_queue(&self) -> Result<Option<NotificationEvent>, QueueError> {
        Ok(self
            .events
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .pop_front())
    }

    fn get_all(&self) -> Result<Vec<NotificationEvent>, QueueError> {
        Ok(self
            .events
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .iter()
            .cloned()
            .collect())
    }
}

/// Queue persisted as one JSONL file; every mutation holds `<path>.lock`.
#[derive(Debug, Clone)]
pub struct JsonlQueue {
    path: PathBuf,
}

impl JsonlQueue {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationQueue for JsonlQueue {
    fn push(&self, event: NotificationEvent) -> Result<String, QueueError> {
        let event_id = event.event_id.clone();
        mutate_jsonl::<NotificationEvent, _, Infallible, _>(&self.path, |events| {
            events.push(event);
            Ok(((), true))
        })?;
        Ok(event_id)
    }

    fn size(&self) -> Result<usize, QueueError> {
        Ok(self.get_all()?.len())
    }

    fn get_first_in_queue(&self) -> Result<Option<NotificationEvent>, QueueError> {
        let first = mutate_jsonl::<NotificationEvent, _, Infallible, _>(&self.path, |events| {
            if events.is_empty() {
                Ok((None, false))
            } else {
                Ok((Some(events.remove(0)), true))
            }
        })?;
        Ok(first)
    }

    fn get_all(&self) -> Result<Vec<NotificationEvent>, QueueError> {
        Ok(read_records_or_empty(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_kernel::ProjectVersion;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn event(artifact: &str) -> NotificationEvent {
        NotificationEvent::new("p-1", &ProjectVersion::new("org.acme", artifact, "1.0"))
    }

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("depot-queue-{prefix}-{}-{unique}", std::process::id()))
            .join("queue.jsonl")
    }

    fn drain(queue: &dyn NotificationQueue) -> Vec<String> {
        let mut artifacts = Vec::new();
        while let Some(event) = queue.get_first_in_queue().expect("pop should succeed") {
            artifacts.push(event.artifact_id);
        }
        artifacts
    }

    #[test]
    fn memory_queue_is_fifo() {
        let queue = MemoryQueue::new();
        let id = queue.push(event("a")).expect("push should succeed");
        queue.push(event("b")).expect("push should succeed");
        assert_eq!(queue.size().expect("size"), 2);
        assert_eq!(
            queue.get_all().expect("get_all")[0].event_id,
            id,
            "oldest event first"
        );

        assert_eq!(drain(&queue), vec!["a", "b"]);
        assert_eq!(queue.size().expect("size"), 0);
        assert!(queue.get_first_in_queue().expect("pop").is_none());
    }

    #[test]
    fn jsonl_queue_survives_reopen_and_pops_in_order() {
        let path = temp_path("reopen");
        {
            let queue = JsonlQueue::open(&path);
            queue.push(event("a")).expect("push should succeed");
            queue.push(event("b")).expect("push should succeed");
            queue.push(event("c")).expect("push should succeed");
        }

        let queue = JsonlQueue::open(&path);
        assert_eq!(queue.size().expect("size"), 3);
        let first = queue
            .get_first_in_queue()
            .expect("pop should succeed")
            .expect("queue should not be empty");
        assert_eq!(first.artifact_id, "a");

        let reopened = JsonlQueue::open(&path);
        assert_eq!(drain(&reopened), vec!["b", "c"]);
        assert!(!depot_store::lock_path_for(&path).exists());

        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn missing_queue_file_is_empty() {
        let queue = JsonlQueue::open(temp_path("missing"));
        assert_eq!(queue.size().expect("size"), 0);
        assert!(queue.get_first_in_queue().expect("pop").is_none());
    }
}
