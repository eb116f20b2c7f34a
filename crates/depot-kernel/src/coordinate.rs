//! Coordinates: the identity of artifact families and their versions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Suffix that marks a mutable, branch-named version.
pub const SNAPSHOT_MARKER: &str = "-SNAPSHOT";

/// `(group_id, artifact_id)`: one artifact family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Attach a version to this coordinate.
    pub fn at(&self, version_id: impl Into<String>) -> ProjectVersion {
        ProjectVersion {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// `(group_id, artifact_id, version_id)`: a single resolvable unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectVersion {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
}

impl ProjectVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }

    /// Whether this version is a snapshot (mutable) rather than a release.
    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.version_id)
    }

    /// `group:artifact:version` rendering.
    pub fn gav(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id, self.artifact_id, self.version_id
        )
    }
}

impl FromStr for ProjectVersion {
    type Err = CoordinateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        let [group_id, artifact_id, version_id] = parts.as_slice() else {
            return Err(CoordinateError::MalformedGav(raw.to_string()));
        };
        let version = ProjectVersion::new(*group_id, *artifact_id, *version_id);
        let problems = coordinate_problems(&version);
        if let Some(problem) = problems.into_iter().next() {
            return Err(problem);
        }
        Ok(version)
    }
}

pub fn is_snapshot_version(version_id: &str) -> bool {
    version_id.ends_with(SNAPSHOT_MARKER)
}

/// Errors raised when a coordinate part is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("expected group:artifact:version, got `{0}`")]
    MalformedGav(String),

    #[error("invalid {field} `{value}`")]
    InvalidPart { field: &'static str, value: String },
}

fn coordinate_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("coordinate regex must compile")
    })
}

/// Check one coordinate part (group, artifact or version id).
pub fn validate_part(field: &'static str, value: &str) -> Result<(), CoordinateError> {
    if coordinate_part_re().is_match(value) {
        Ok(())
    } else {
        Err(CoordinateError::InvalidPart {
            field,
            value: value.to_string(),
        })
    }
}

/// All malformed parts of `version`, in group/artifact/version order.
pub fn coordinate_problems(version: &ProjectVersion) -> Vec<CoordinateError> {
    [
        validate_part("groupId", &version.group_id),
        validate_part("artifactId", &version.artifact_id),
        validate_part("versionId", &version.version_id),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}
