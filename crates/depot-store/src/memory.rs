//! Canonical in-memory representation of version/project state.
//!
//! This is the memory boundary for `depot-store`:
//! - deterministic version/project queries
//! - coordinate ownership checks
//! - a reverse index for dependant lookups
//!
//! `VersionState` is plain data; `MemoryVersionStore` wraps it behind a
//! mutex to satisfy the shared `VersionStore` contract.

use depot_kernel::{
    Coordinate, ProjectRecord, ProjectVersion, StoreError, VersionRecord, VersionStore,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::index::DependantIndex;

/// Deterministic in-memory projection of tracked versions and projects.
#[derive(Debug, Clone, Default)]
pub struct VersionState {
    versions: BTreeMap<ProjectVersion, VersionRecord>,
    projects: BTreeMap<Coordinate, ProjectRecord>,
    dependants: DependantIndex,
}

impl VersionState {
    /// Build state from fully-materialized records.
    ///
    /// Duplicate versions resolve with last-write-wins, matching append
    /// semantics of JSONL files. Duplicate project coordinates are conflicts.
    pub fn from_records(
        versions: Vec<VersionRecord>,
        projects: Vec<ProjectRecord>,
    ) -> Result<Self, StoreError> {
        let mut state = Self::default();
        for project in projects {
            state.register_project(project)?;
        }
        for record in versions {
            state.upsert_version(record);
        }
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn version(&self, version: &ProjectVersion) -> Option<&VersionRecord> {
        self.versions.get(version)
    }

    /// Insert or replace a version record. Returns the previous value.
    pub fn upsert_version(&mut self, record: VersionRecord) -> Option<VersionRecord> {
        let previous = self.versions.insert(record.version.clone(), record.clone());
        self.dependants.replace(previous.as_ref(), &record);
        previous
    }

    /// Iterate all versions in deterministic order.
    pub fn versions(&self) -> impl Iterator<Item = &VersionRecord> {
        self.versions.values()
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.projects.values()
    }

    pub fn snapshot_versions(&self, coordinate: &Coordinate) -> Vec<&VersionRecord> {
        self.versions
            .values()
            .filter(|record| record.coordinate() == *coordinate && record.is_snapshot())
            .collect()
    }

    pub fn project(&self, coordinate: &Coordinate) -> Option<&ProjectRecord> {
        self.projects.get(coordinate)
    }

    /// Register `project` as the owner of its coordinate.
    pub fn register_project(&mut self, project: ProjectRecord) -> Result<ProjectRecord, StoreError> {
        let coordinate = project.coordinate();
        if let Some(existing) = self.projects.get(&coordinate)
            && existing.project_id != project.project_id
        {
            return Err(StoreError::ProjectConflict {
                coordinate: coordinate.to_string(),
                existing: existing.project_id.clone(),
                requested: project.project_id,
            });
        }
        self.projects.insert(coordinate, project.clone());
        Ok(project)
    }

    pub fn dependants_of(&self, version: &ProjectVersion) -> Vec<&VersionRecord> {
        self.dependants
            .dependants_of(version)
            .into_iter()
            .filter_map(|dependant| self.versions.get(dependant))
            .collect()
    }
}

/// Process-local version store.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    state: Mutex<VersionState>,
}

impl MemoryVersionStore {
    pub fn new(state: VersionState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<VersionState, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, VersionState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("version state lock poisoned".to_string()))
    }
}

impl VersionStore for MemoryVersionStore {
    fn find(&self, version: &ProjectVersion) -> Result<Option<VersionRecord>, StoreError> {
        Ok(self.lock()?.version(version).cloned())
    }

    fn create_or_update(&self, record: VersionRecord) -> Result<VersionRecord, StoreError> {
        self.lock()?.upsert_version(record.clone());
        Ok(record)
    }

    fn find_snapshot_versions(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self
            .lock()?
            .snapshot_versions(coordinate)
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_project(&self, coordinate: &Coordinate) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.lock()?.project(coordinate).cloned())
    }

    fn register_project(&self, project: ProjectRecord) -> Result<ProjectRecord, StoreError> {
        self.lock()?.register_project(project)
    }

    fn find_dependants(&self, version: &ProjectVersion) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self
            .lock()?
            .dependants_of(version)
            .into_iter()
            .cloned()
            .collect())
    }
}
