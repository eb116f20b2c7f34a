//! Fixture-backed artifact repository.
//!
//! Serves version lists, dependency facts and file listings from a JSON
//! document instead of a live upstream. Used by the CLI for offline runs and
//! by tests that need a controllable repository.
//!
//! ```json
//! {
//!   "artifacts": [
//!     {
//!       "group_id": "org.acme",
//!       "artifact_id": "core",
//!       "versions": [
//!         { "version": "1.0", "dependencies": ["org.acme:util:2.0"],
//!           "files": [{ "kind": "jar", "name": "core-1.0.jar" }] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use depot_kernel::{
    ArtifactDependency, ArtifactFile, ArtifactRepository, Coordinate, ProjectVersion,
    RepositoryError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryFixture {
    #[serde(default)]
    pub artifacts: Vec<FixtureArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureArtifact {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub versions: Vec<FixtureVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureVersion {
    pub version: String,
    /// `group:artifact:version` strings, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub files: Vec<ArtifactFile>,
}

#[derive(Debug, Clone, Default)]
struct PublishedVersion {
    dependencies: Vec<ArtifactDependency>,
    files: Vec<ArtifactFile>,
}

/// In-process repository with injectable outages.
#[derive(Debug, Default)]
pub struct FixtureRepository {
    published: BTreeMap<Coordinate, BTreeMap<String, PublishedVersion>>,
    failing: Mutex<BTreeSet<ProjectVersion>>,
    unavailable: Mutex<bool>,
    dependency_calls: Mutex<Vec<ProjectVersion>>,
}

impl FixtureRepository {
    /// Load a fixture document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Io(format!("{}: {e}", path.display())))?;
        let fixture: RepositoryFixture =
            serde_json::from_str(&raw).map_err(|e| RepositoryError::Malformed {
                gav: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_fixture(fixture)
    }

    pub fn from_fixture(fixture: RepositoryFixture) -> Result<Self, RepositoryError> {
        let mut repository = Self::default();
        for artifact in fixture.artifacts {
            let coordinate = Coordinate::new(artifact.group_id, artifact.artifact_id);
            for published in artifact.versions {
                let version = coordinate.at(published.version.clone());
                let dependencies = published
                    .dependencies
                    .iter()
                    .map(|raw| {
                        raw.parse::<ProjectVersion>()
                            .map(|dep| {
                                ArtifactDependency::new(dep.group_id, dep.artifact_id, dep.version_id)
                            })
                            .map_err(|e| RepositoryError::Malformed {
                                gav: version.gav(),
                                message: e.to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                repository.publish_with_files(version, dependencies, published.files);
            }
        }
        Ok(repository)
    }

    /// Publish `version` with the given direct dependencies.
    pub fn with_version(mut self, version: ProjectVersion, dependencies: Vec<ProjectVersion>) -> Self {
        let dependencies = dependencies
            .into_iter()
            .map(|d| ArtifactDependency::new(d.group_id, d.artifact_id, d.version_id))
            .collect();
        self.publish_with_files(version, dependencies, Vec::new());
        self
    }

    pub fn publish_with_files(
        &mut self,
        version: ProjectVersion,
        dependencies: Vec<ArtifactDependency>,
        files: Vec<ArtifactFile>,
    ) {
        let mut unique = BTreeSet::new();
        let dependencies = dependencies
            .into_iter()
            .filter(|dependency| unique.insert(dependency.clone()))
            .collect();
        self.published
            .entry(version.coordinate())
            .or_default()
            .insert(
                version.version_id,
                PublishedVersion {
                    dependencies,
                    files,
                },
            );
    }

    /// Make dependency lookups for `version` fail until healed.
    pub fn fail_dependencies_of(&self, version: ProjectVersion) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(version);
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
        self.set_unavailable(false);
    }

    /// Make every call fail as if the upstream were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = unavailable;
        }
    }

    /// Versions passed to `find_dependencies`, in call order.
    pub fn dependency_calls(&self) -> Vec<ProjectVersion> {
        self.dependency_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        let unavailable = self
            .unavailable
            .lock()
            .map(|flag| *flag)
            .map_err(|_| RepositoryError::Io("fixture state poisoned".to_string()))?;
        if unavailable {
            return Err(RepositoryError::Unavailable(
                "fixture repository offline".to_string(),
            ));
        }
        Ok(())
    }

    fn published(&self, version: &ProjectVersion) -> Option<&PublishedVersion> {
        self.published
            .get(&version.coordinate())
            .and_then(|versions| versions.get(&version.version_id))
    }
}

impl ArtifactRepository for FixtureRepository {
    fn find_version(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> Result<Option<String>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .published
            .get(coordinate)
            .and_then(|versions| versions.get_key_value(version))
            .map(|(id, _)| id.clone()))
    }

    fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .published
            .get(coordinate)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn find_dependencies(
        &self,
        version: &ProjectVersion,
    ) -> Result<Vec<ArtifactDependency>, RepositoryError> {
        if let Ok(mut calls) = self.dependency_calls.lock() {
            calls.push(version.clone());
        }
        self.check_available()?;
        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(version))
            .unwrap_or(false);
        if failing {
            return Err(RepositoryError::Io(format!(
                "failed to fetch metadata for {version}"
            )));
        }
        Ok(self
            .published(version)
            .map(|published| published.dependencies.clone())
            .unwrap_or_default())
    }

    fn find_files(
        &self,
        kind: &str,
        version: &ProjectVersion,
    ) -> Result<Vec<ArtifactFile>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .published(version)
            .map(|published| {
                published
                    .files
                    .iter()
                    .filter(|file| file.kind == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
