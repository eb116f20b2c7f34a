//! File-backed version store over two JSONL files.
//!
//! ```text
//! <root>/versions.jsonl   one VersionRecord per line
//! <root>/projects.jsonl   one ProjectRecord per line
//! <root>/store.lock       held for the duration of every write
//! ```
//!
//! Reads hydrate a fresh `VersionState` from disk so every call observes the
//! last completed write (read-your-writes across processes).

use depot_kernel::{
    Coordinate, ProjectRecord, ProjectVersion, StoreError, VersionRecord, VersionStore,
};
use std::path::{Path, PathBuf};

use crate::atomic_store::FileLockGuard;
use crate::jsonl::{JsonlError, read_records_or_empty, write_records_to_path};
use crate::memory::VersionState;

pub const VERSIONS_FILE: &str = "versions.jsonl";
pub const PROJECTS_FILE: &str = "projects.jsonl";
pub const STORE_LOCK_FILE: &str = "store.lock";

#[derive(Debug, Clone)]
pub struct JsonlVersionStore {
    root: PathBuf,
}

impl JsonlVersionStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn versions_path(&self) -> PathBuf {
        self.root.join(VERSIONS_FILE)
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join(PROJECTS_FILE)
    }

    /// Load the full state from disk.
    pub fn load(&self) -> Result<VersionState, StoreError> {
        let versions: Vec<VersionRecord> =
            read_records_or_empty(self.versions_path()).map_err(backend)?;
        let projects: Vec<ProjectRecord> =
            read_records_or_empty(self.projects_path()).map_err(backend)?;
        VersionState::from_records(versions, projects)
    }

    fn save(&self, state: &VersionState) -> Result<(), StoreError> {
        let versions: Vec<&VersionRecord> = state.versions().collect();
        let projects: Vec<&ProjectRecord> = state.projects().collect();
        write_records_to_path(self.versions_path(), &versions).map_err(backend)?;
        write_records_to_path(self.projects_path(), &projects).map_err(backend)?;
        Ok(())
    }

    /// Run one lock-scoped read-modify-write over the whole state.
    fn mutate<T>(
        &self,
        mutator: impl FnOnce(&mut VersionState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = FileLockGuard::acquire(&self.root.join(STORE_LOCK_FILE))
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let mut state = self.load()?;
        let value = mutator(&mut state)?;
        self.save(&state)?;
        tracing::debug!(
            root = %self.root.display(),
            versions = state.len(),
            "version store written"
        );
        Ok(value)
    }
}

fn backend(err: JsonlError) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl VersionStore for JsonlVersionStore {
    fn find(&self, version: &ProjectVersion) -> Result<Option<VersionRecord>, StoreError> {
        Ok(self.load()?.version(version).cloned())
    }

    fn create_or_update(&self, record: VersionRecord) -> Result<VersionRecord, StoreError> {
        self.mutate(|state| {
            state.upsert_version(record.clone());
            Ok(record)
        })
    }

    fn find_snapshot_versions(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self
            .load()?
            .snapshot_versions(coordinate)
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_project(&self, coordinate: &Coordinate) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.load()?.project(coordinate).cloned())
    }

    fn register_project(&self, project: ProjectRecord) -> Result<ProjectRecord, StoreError> {
        self.mutate(|state| state.register_project(project))
    }

    fn find_dependants(&self, version: &ProjectVersion) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self
            .load()?
            .dependants_of(version)
            .into_iter()
            .cloned()
            .collect())
    }
}
