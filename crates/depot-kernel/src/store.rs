//! Version store boundary.
//!
//! The store owns persisted version/project records. Implementations must
//! serialize concurrent writes to the same version; the kernel does no
//! locking of its own.

use crate::coordinate::{Coordinate, ProjectVersion};
use crate::record::{ProjectRecord, VersionRecord};

/// Errors raised by a version store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Backend(String),

    #[error("coordinate {coordinate} is owned by project {existing}, not {requested}")]
    ProjectConflict {
        coordinate: String,
        existing: String,
        requested: String,
    },
}

/// CRUD + lookup for version and project records.
pub trait VersionStore: Send + Sync {
    fn find(&self, version: &ProjectVersion) -> Result<Option<VersionRecord>, StoreError>;

    /// Insert or replace the record keyed by its version.
    fn create_or_update(&self, record: VersionRecord) -> Result<VersionRecord, StoreError>;

    /// Every tracked snapshot version of `coordinate`, evicted ones included.
    fn find_snapshot_versions(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Vec<VersionRecord>, StoreError>;

    /// The project owning `coordinate`, if registered.
    fn find_project(&self, coordinate: &Coordinate) -> Result<Option<ProjectRecord>, StoreError>;

    /// Register a project for its coordinate.
    ///
    /// Re-registering the same `project_id` is a no-op update; a different
    /// id for an owned coordinate is a `ProjectConflict`.
    fn register_project(&self, project: ProjectRecord) -> Result<ProjectRecord, StoreError>;

    /// Records whose direct dependencies include exactly `version`.
    fn find_dependants(&self, version: &ProjectVersion) -> Result<Vec<VersionRecord>, StoreError>;
}
