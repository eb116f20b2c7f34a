//! Queue and retry controller.
//!
//! Drains the queue one event at a time: validate, handle, then archive,
//! re-queue for retry, or dead-letter into the archive as FAILED. Handler
//! errors become error responses; only queue and archive persistence
//! failures escape the drain loop.

use chrono::Utc;
use depot_kernel::ProjectVersion;
use std::sync::Arc;

use crate::archive::NotificationArchive;
use crate::event::{DEFAULT_MAX_ATTEMPTS, NotificationEvent, NotificationResponse, Priority};
use crate::handler::{HandlerOutcome, NotificationHandler};
use crate::queue::{NotificationQueue, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Explicit form of `notify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub project_id: String,
    pub version: ProjectVersion,
    pub full_update: bool,
    pub transitive: bool,
    pub priority: Priority,
}

impl NotifyRequest {
    pub fn new(project_id: impl Into<String>, version: ProjectVersion) -> Self {
        Self {
            project_id: project_id.into(),
            version,
            full_update: false,
            transitive: false,
            priority: Priority::High,
        }
    }
}

/// What happened to one handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Succeeded,
    Failed,
    Retried,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleReport {
    pub event_id: String,
    pub attempt: u32,
    pub disposition: Disposition,
    pub cascaded: usize,
}

pub struct NotificationController {
    queue: Arc<dyn NotificationQueue>,
    archive: Arc<dyn NotificationArchive>,
    handler: Arc<dyn NotificationHandler>,
    max_attempts: u32,
}

impl NotificationController {
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        archive: Arc<dyn NotificationArchive>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Self {
        Self {
            queue,
            archive,
            handler,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn queue(&self) -> &dyn NotificationQueue {
        self.queue.as_ref()
    }

    pub fn archive(&self) -> &dyn NotificationArchive {
        self.archive.as_ref()
    }

    /// Queue a high-priority refresh of one version.
    pub fn notify(
        &self,
        project_id: &str,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> Result<String, NotifyError> {
        self.notify_with(NotifyRequest::new(
            project_id,
            ProjectVersion::new(group_id, artifact_id, version_id),
        ))
    }

    /// Validate synchronously and queue; rejected requests never enter the queue.
    pub fn notify_with(&self, request: NotifyRequest) -> Result<String, NotifyError> {
        let event = NotificationEvent::new(request.project_id, &request.version)
            .with_full_update(request.full_update)
            .with_transitive(request.transitive)
            .with_priority(request.priority)
            .with_max_attempts(self.max_attempts);

        let errors = self.handler.validate(&event);
        if !errors.is_empty() {
            tracing::warn!(version = %request.version, ?errors, "notification rejected");
            return Err(NotifyError::Validation(errors));
        }

        let event_id = self.queue.push(event)?;
        tracing::info!(%event_id, version = %request.version, "notification queued");
        Ok(event_id)
    }

    /// Handle the oldest queued event. Returns how many were handled (0 or 1).
    pub fn handle(&self) -> Result<usize, QueueError> {
        match self.queue.get_first_in_queue()? {
            Some(event) => {
                self.handle_event(event)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Handle until the queue is empty, including events queued while draining.
    pub fn handle_all(&self) -> Result<usize, QueueError> {
        let mut handled = 0;
        while self.handle()? == 1 {
            handled += 1;
        }
        if handled > 0 {
            tracing::debug!(handled, "queue drained");
        }
        Ok(handled)
    }

    /// Handle one popped event.
    ///
    /// Cascaded children are queued before the outcome is archived. If the
    /// archive write fails, the event goes back on the queue as it was popped
    /// and the error is returned, so no event is ever lost.
    pub fn handle_event(&self, event: NotificationEvent) -> Result<HandleReport, QueueError> {
        let popped = event.clone();
        let event = event.begin_attempt();
        let event_id = event.event_id.clone();
        let attempt = event.attempt;

        let errors = self.handler.validate(&event);
        if !errors.is_empty() {
            tracing::warn!(%event_id, attempt, ?errors, "event failed validation");
            self.archive_or_requeue(
                &popped,
                event.complete(NotificationResponse::failed(errors), Utc::now()),
            )?;
            return Ok(HandleReport {
                event_id,
                attempt,
                disposition: Disposition::Failed,
                cascaded: 0,
            });
        }

        let (response, cascade, retryable) = match self.handler.handle_notification(&event) {
            Ok(HandlerOutcome { response, cascade }) => (response, cascade, true),
            Err(err) => {
                tracing::warn!(%event_id, attempt, error = %err, "refresh failed");
                (
                    NotificationResponse::failed(err.messages()),
                    Vec::new(),
                    err.is_retryable(),
                )
            }
        };

        let cascaded = cascade.len();
        for child in cascade {
            self.queue.push(
                child
                    .with_parent(&event_id)
                    .with_max_attempts(self.max_attempts),
            )?;
        }

        let disposition = if !response.has_errors() {
            self.archive_or_requeue(&popped, event.complete(response, Utc::now()))?;
            Disposition::Succeeded
        } else if retryable && event.attempts_remaining() {
            tracing::info!(%event_id, attempt, max_attempts = event.max_attempts, "event requeued");
            self.queue.push(event.with_response(response))?;
            Disposition::Retried
        } else {
            tracing::warn!(%event_id, attempt, "event failed permanently");
            self.archive_or_requeue(&popped, event.complete(response, Utc::now()))?;
            Disposition::Failed
        };

        Ok(HandleReport {
            event_id,
            attempt,
            disposition,
            cascaded,
        })
    }

    fn archive_or_requeue(
        &self,
        popped: &NotificationEvent,
        completed: NotificationEvent,
    ) -> Result<(), QueueError> {
        if let Err(err) = self.archive.archive(completed) {
            tracing::error!(event_id = %popped.event_id, error = %err, "archive failed; event requeued");
            self.queue.push(popped.clone())?;
            return Err(err);
        }
        Ok(())
    }
}
