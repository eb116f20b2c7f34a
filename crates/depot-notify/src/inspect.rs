//! Property extraction for full updates.

use depot_kernel::{ArtifactFile, ProjectVersion};
use std::collections::BTreeMap;

use crate::handler::RefreshError;

/// File kinds listed from the repository on a full update.
pub const INSPECTED_FILE_KINDS: [&str; 2] = ["pom", "jar"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedProperties {
    pub properties: BTreeMap<String, String>,
    pub manifest_properties: BTreeMap<String, String>,
}

pub trait ArtifactInspector: Send + Sync {
    fn inspect(
        &self,
        version: &ProjectVersion,
        files: &[ArtifactFile],
    ) -> Result<ExtractedProperties, RefreshError>;
}

/// Extracts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInspection;

impl ArtifactInspector for NoInspection {
    fn inspect(
        &self,
        _: &ProjectVersion,
        _: &[ArtifactFile],
    ) -> Result<ExtractedProperties, RefreshError> {
        Ok(ExtractedProperties::default())
    }
}

/// Records the published file names per kind as `files.<kind>` properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileListInspector;

impl ArtifactInspector for FileListInspector {
    fn inspect(
        &self,
        _: &ProjectVersion,
        files: &[ArtifactFile],
    ) -> Result<ExtractedProperties, RefreshError> {
        let mut by_kind: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for file in files {
            by_kind
                .entry(format!("files.{}", file.kind))
                .or_default()
                .push(file.name.as_str());
        }
        Ok(ExtractedProperties {
            properties: by_kind
                .into_iter()
                .map(|(key, names)| (key, names.join(",")))
                .collect(),
            manifest_properties: BTreeMap::new(),
        })
    }
}
