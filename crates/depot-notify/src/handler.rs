//! Handler contract and the per-kind handler registry.

use depot_kernel::{RepositoryError, ResolveError, StoreError, VersionStore};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::event::{NotificationEvent, NotificationResponse};

/// Failures of one handling attempt.
///
/// `Rejected` is the validation class and is never retried; everything else
/// is a processing error retried up to the event's attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("{}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("Could not find version {0}")]
    VersionNotFound(String),

    #[error("Could not find dependent project: [{0}]")]
    MissingDependentProject(String),

    #[error("no handler registered for project kind `{0}`")]
    NoHandler(String),

    #[error("inspection of {gav} failed: {message}")]
    Inspection { gav: String, message: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RefreshError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::NoHandler(_))
    }

    /// Error lines for a response.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Rejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Result of a successful handling attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutcome {
    pub response: NotificationResponse,
    /// Child events to enqueue once this event is processed.
    pub cascade: Vec<NotificationEvent>,
}

pub trait NotificationHandler: Send + Sync {
    /// Synchronous admission checks; an empty list admits the event.
    fn validate(&self, event: &NotificationEvent) -> Vec<String>;

    fn handle_notification(&self, event: &NotificationEvent)
    -> Result<HandlerOutcome, RefreshError>;
}

/// Dispatches events to the handler registered for the owning project's kind.
///
/// Coordinates without a registered project use the default kind.
pub struct HandlerRegistry {
    store: Arc<dyn VersionStore>,
    handlers: BTreeMap<String, Arc<dyn NotificationHandler>>,
    default_kind: String,
}

impl HandlerRegistry {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self {
            store,
            handlers: BTreeMap::new(),
            default_kind: depot_kernel::DEFAULT_PROJECT_KIND.to_string(),
        }
    }

    pub fn register(
        mut self,
        kind: impl Into<String>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    fn kind_of(&self, event: &NotificationEvent) -> Result<String, StoreError> {
        Ok(self
            .store
            .find_project(&event.coordinate())?
            .map(|project| project.kind)
            .unwrap_or_else(|| self.default_kind.clone()))
    }

    fn handler_for(
        &self,
        event: &NotificationEvent,
    ) -> Result<&Arc<dyn NotificationHandler>, RefreshError> {
        let kind = self.kind_of(event)?;
        self.handlers
            .get(&kind)
            .ok_or(RefreshError::NoHandler(kind))
    }
}

impl NotificationHandler for HandlerRegistry {
    fn validate(&self, event: &NotificationEvent) -> Vec<String> {
        match self.handler_for(event) {
            Ok(handler) => handler.validate(event),
            Err(err) => err.messages(),
        }
    }

    fn handle_notification(
        &self,
        event: &NotificationEvent,
    ) -> Result<HandlerOutcome, RefreshError> {
        self.handler_for(event)?.handle_notification(event)
    }
}
