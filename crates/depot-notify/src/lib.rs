//! # depot-notify
//!
//! Refresh notifications: the event model, the queue and archive contracts
//! with memory and JSONL adapters, the refresh handler, and the controller
//! that drains the queue with bounded retries.
//!
//! ```text
//! notify() ──validate──► NotificationQueue ──get_first_in_queue──► NotificationController
//!                                                                      │ handle_notification
//!                                                                      ▼
//!                          cascade / retry ◄── HandlerRegistry ──► RefreshHandler ──► ResolutionEngine
//!                                                                      │
//!                                                               NotificationArchive
//! ```

pub mod archive;
pub mod config;
pub mod controller;
pub mod event;
pub mod handler;
pub mod inspect;
pub mod queue;
pub mod refresh;

pub use archive::{JsonlArchive, MemoryArchive, NotificationArchive, NotificationFilter};
pub use config::{
    CONFIG_FILE, ConfigError, ControllerConfig, DepotConfig, ENV_MAX_ATTEMPTS,
    ENV_SNAPSHOT_LIMIT, RefreshConfig, RepositoryConfig, StorageConfig, WorkerConfig,
};
pub use controller::{
    Disposition, HandleReport, NotificationController, NotifyError, NotifyRequest,
};
pub use event::{
    DEFAULT_MAX_ATTEMPTS, EventStatus, NotificationEvent, NotificationResponse, Priority,
};
pub use handler::{HandlerOutcome, HandlerRegistry, NotificationHandler, RefreshError};
pub use inspect::{
    ArtifactInspector, ExtractedProperties, FileListInspector, INSPECTED_FILE_KINDS,
    NoInspection,
};
pub use queue::{JsonlQueue, MemoryQueue, NotificationQueue, QueueError};
pub use refresh::{DEFAULT_SNAPSHOT_LIMIT, RefreshHandler};
