//! Upstream artifact repository boundary.
//!
//! The repository resolves raw dependency facts, version lists and files for
//! a coordinate. Absence is reported as `None`/empty; only transport or
//! format failures are errors.

use serde::{Deserialize, Serialize};

use crate::coordinate::{Coordinate, ProjectVersion};

/// A raw dependency fact discovered from build metadata.
///
/// Not yet validated against the version store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactDependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn to_version(&self) -> ProjectVersion {
        ProjectVersion::new(
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.version.clone(),
        )
    }
}

impl From<ArtifactDependency> for ProjectVersion {
    fn from(dependency: ArtifactDependency) -> Self {
        ProjectVersion::new(dependency.group_id, dependency.artifact_id, dependency.version)
    }
}

/// One file published for a version (jar, pom, sources, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

/// Errors raised by a repository client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("repository I/O error: {0}")]
    Io(String),

    #[error("malformed repository metadata for {gav}: {message}")]
    Malformed { gav: String, message: String },
}

/// Client for the upstream artifact repository.
///
/// Implementations bound their own I/O time; the core never cancels a call.
pub trait ArtifactRepository: Send + Sync {
    /// The canonical version string if `version` exists for `coordinate`.
    fn find_version(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> Result<Option<String>, RepositoryError>;

    /// Every published version of `coordinate`, releases and snapshots.
    fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>, RepositoryError>;

    /// Direct dependencies declared by `version`, without duplicates.
    fn find_dependencies(
        &self,
        version: &ProjectVersion,
    ) -> Result<Vec<ArtifactDependency>, RepositoryError>;

    /// Files of a given `kind` published for `version`.
    fn find_files(
        &self,
        kind: &str,
        version: &ProjectVersion,
    ) -> Result<Vec<ArtifactFile>, RepositoryError>;
}
