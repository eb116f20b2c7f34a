//! Persisted records: projects, versions, and cached closure reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::coordinate::{Coordinate, ProjectVersion};

/// Default handler kind for projects registered without an explicit one.
pub const DEFAULT_PROJECT_KIND: &str = "library";

/// The project that owns a coordinate.
///
/// At most one `project_id` may own a given `(group_id, artifact_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    DEFAULT_PROJECT_KIND.to_string()
}

impl ProjectRecord {
    pub fn new(project_id: impl Into<String>, coordinate: &Coordinate) -> Self {
        Self {
            project_id: project_id.into(),
            group_id: coordinate.group_id.clone(),
            artifact_id: coordinate.artifact_id.clone(),
            kind: default_kind(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }
}

/// Deduplicated transitive closure plus its validity flag.
///
/// `valid=false` means resolution hit an excluded or invalid dependency;
/// the list may then be partial.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitiveDependencyReport {
    #[serde(default)]
    pub transitive_dependencies: Vec<ProjectVersion>,
    pub valid: bool,
}

impl TransitiveDependencyReport {
    pub fn valid(transitive_dependencies: Vec<ProjectVersion>) -> Self {
        Self {
            transitive_dependencies,
            valid: true,
        }
    }

    pub fn invalid(transitive_dependencies: Vec<ProjectVersion>) -> Self {
        Self {
            transitive_dependencies,
            valid: false,
        }
    }

    pub fn len(&self) -> usize {
        self.transitive_dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitive_dependencies.is_empty()
    }

    pub fn contains(&self, version: &ProjectVersion) -> bool {
        self.transitive_dependencies.contains(version)
    }
}

/// Persisted metadata of one tracked version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    // ── Identity ──
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(flatten)]
    pub version: ProjectVersion,

    // ── Declared dependencies ──
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ProjectVersion>,

    // ── Usability markers ──
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exclusion_reason: String,
    #[serde(default)]
    pub evicted: bool,

    // ── Extracted metadata (opaque to resolution) ──
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manifest_properties: BTreeMap<String, String>,

    // ── Cached closure ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitive: Option<TransitiveDependencyReport>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(project_id: impl Into<String>, version: ProjectVersion) -> Self {
        Self {
            project_id: project_id.into(),
            version,
            dependencies: Vec::new(),
            excluded: false,
            exclusion_reason: String::new(),
            evicted: false,
            properties: BTreeMap::new(),
            manifest_properties: BTreeMap::new(),
            transitive: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ProjectVersion>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_report(mut self, report: TransitiveDependencyReport) -> Self {
        self.transitive = Some(report);
        self
    }

    /// Mark this version permanently unusable.
    pub fn exclude(&mut self, reason: impl Into<String>) {
        self.excluded = true;
        self.exclusion_reason = reason.into();
        self.touch_updated_at();
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.is_snapshot()
    }

    pub fn coordinate(&self) -> Coordinate {
        self.version.coordinate()
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }
}
