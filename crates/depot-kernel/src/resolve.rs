//! Transitive closure resolution.
//!
//! Resolution walks a version's declared dependencies store-first, falling
//! back to the upstream repository for versions the store has never seen.
//! Contributions are deduplicated by coordinate. A directly declared version
//! always wins; any other coordinate keeps its first occurrence in traversal
//! order, so a version reached through one dependency overrides the same
//! coordinate reached later through another.
//!
//! Graph-shape problems (exclusion, invalid nested reports, eviction, depth)
//! never raise; they clear the report's `valid` flag. Store and repository
//! failures propagate unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::coordinate::{Coordinate, ProjectVersion};
use crate::record::{TransitiveDependencyReport, VersionRecord};
use crate::repository::{ArtifactDependency, ArtifactRepository, RepositoryError};
use crate::store::{StoreError, VersionStore};

/// Maximum nesting walked below the root before a branch is abandoned.
pub const MAX_RESOLUTION_DEPTH: usize = 64;

/// Errors that abort a resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A release may not depend on a snapshot.
///
/// Returns one message per offending dependency; snapshots impose no
/// constraint on their own dependencies.
pub fn validate_dependencies(dependencies: &[ArtifactDependency], version_id: &str) -> Vec<String> {
    if crate::coordinate::is_snapshot_version(version_id) {
        return Vec::new();
    }
    dependencies
        .iter()
        .map(ArtifactDependency::to_version)
        .filter(ProjectVersion::is_snapshot)
        .map(|dependency| {
            format!("Snapshot dependency {dependency} for release version {version_id}")
        })
        .collect()
}

/// Computes and persists transitive closures over a store and repository.
pub struct ResolutionEngine<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    repository: &'a R,
}

impl<'a, S, R> ResolutionEngine<'a, S, R>
where
    S: VersionStore + ?Sized,
    R: ArtifactRepository + ?Sized,
{
    pub fn new(store: &'a S, repository: &'a R) -> Self {
        Self { store, repository }
    }

    /// Raw dependency facts straight from the repository. Not cached.
    pub fn retrieve_raw_dependencies(
        &self,
        version: &ProjectVersion,
    ) -> Result<Vec<ArtifactDependency>, ResolveError> {
        Ok(self.repository.find_dependencies(version)?)
    }

    /// Compute the closure of `record` without persisting it.
    pub fn compute_closure(
        &self,
        record: &VersionRecord,
    ) -> Result<TransitiveDependencyReport, ResolveError> {
        let root = record.coordinate();
        let mut walk = Walk {
            engine: self,
            path: BTreeSet::from([root.clone()]),
            visited: BTreeSet::new(),
            contributions: Vec::new(),
            valid: true,
        };
        for dependency in &record.dependencies {
            walk.visit(dependency, 1)?;
        }

        // Declared versions pin their coordinate even when another branch
        // reaches the same coordinate earlier in traversal order.
        let mut pinned: BTreeMap<Coordinate, &ProjectVersion> = BTreeMap::new();
        for dependency in &record.dependencies {
            pinned.entry(dependency.coordinate()).or_insert(dependency);
        }

        let mut seen: BTreeSet<Coordinate> = BTreeSet::from([root]);
        let transitive_dependencies: Vec<ProjectVersion> = walk
            .contributions
            .into_iter()
            .filter(|version| {
                let coordinate = version.coordinate();
                if pinned
                    .get(&coordinate)
                    .is_some_and(|declared| *declared != version)
                {
                    return false;
                }
                seen.insert(coordinate)
            })
            .collect();

        Ok(TransitiveDependencyReport {
            transitive_dependencies,
            valid: walk.valid,
        })
    }

    /// Compute the closure of `record` and persist it on the record.
    pub fn resolve_closure(&self, mut record: VersionRecord) -> Result<VersionRecord, ResolveError> {
        let report = self.compute_closure(&record)?;
        tracing::debug!(
            version = %record.version,
            closure = report.len(),
            valid = report.valid,
            "transitive closure computed"
        );
        record.transitive = Some(report);
        record.touch_updated_at();
        Ok(self.store.create_or_update(record)?)
    }

    /// Recompute every snapshot that depends on `version`, transitively.
    ///
    /// The affected dependants are collected first, then each is recomputed
    /// once, after every affected snapshot it declares. Dependants caught in a
    /// cycle are taken in discovery order. Releases never propagate. Returns
    /// the recomputed versions in the order they were written.
    pub fn propagate_to_snapshot_dependants(
        &self,
        version: &ProjectVersion,
    ) -> Result<Vec<ProjectVersion>, ResolveError> {
        if !version.is_snapshot() {
            return Ok(Vec::new());
        }

        let mut pending: BTreeMap<ProjectVersion, VersionRecord> = BTreeMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([version.clone()]);
        while let Some(current) = queue.pop_front() {
            for dependant in self.store.find_dependants(&current)? {
                if !dependant.is_snapshot()
                    || dependant.version == *version
                    || pending.contains_key(&dependant.version)
                {
                    continue;
                }
                order.push(dependant.version.clone());
                queue.push_back(dependant.version.clone());
                pending.insert(dependant.version.clone(), dependant);
            }
        }

        let mut updated = Vec::with_capacity(order.len());
        while !order.is_empty() {
            let ready = order
                .iter()
                .position(|candidate| {
                    pending.get(candidate).is_some_and(|record| {
                        !record.dependencies.iter().any(|dependency| {
                            dependency != candidate && pending.contains_key(dependency)
                        })
                    })
                })
                .unwrap_or(0);
            let next = order.remove(ready);
            let Some(dependant) = pending.remove(&next) else {
                continue;
            };
            let refreshed = self.resolve_closure(dependant)?;
            tracing::debug!(
                dependant = %refreshed.version,
                changed = %version,
                "snapshot dependant recomputed"
            );
            updated.push(refreshed.version);
        }

        Ok(updated)
    }
}

struct Walk<'w, 'a, S: ?Sized, R: ?Sized> {
    engine: &'w ResolutionEngine<'a, S, R>,
    path: BTreeSet<Coordinate>,
    /// Versions already visited in this walk; a later visit adds nothing.
    visited: BTreeSet<ProjectVersion>,
    contributions: Vec<ProjectVersion>,
    valid: bool,
}

impl<S, R> Walk<'_, '_, S, R>
where
    S: VersionStore + ?Sized,
    R: ArtifactRepository + ?Sized,
{
    fn visit(&mut self, dependency: &ProjectVersion, depth: usize) -> Result<(), ResolveError> {
        let coordinate = dependency.coordinate();
        if self.path.contains(&coordinate) {
            tracing::trace!(%dependency, "cycle on active path; not descending");
            return Ok(());
        }
        if depth > MAX_RESOLUTION_DEPTH {
            tracing::warn!(%dependency, depth, "resolution depth exceeded");
            self.valid = false;
            return Ok(());
        }
        if !self.visited.insert(dependency.clone()) {
            return Ok(());
        }

        match self.engine.store.find(dependency)? {
            Some(record) if record.excluded => {
                tracing::debug!(%dependency, reason = %record.exclusion_reason, "excluded dependency");
                self.valid = false;
            }
            Some(record) if record.evicted => {
                tracing::debug!(%dependency, "evicted dependency");
                self.valid = false;
            }
            Some(record) => match record.transitive {
                Some(report) if !report.valid => {
                    tracing::debug!(%dependency, "dependency has an invalid closure");
                    self.valid = false;
                }
                Some(report) => {
                    self.contributions.push(dependency.clone());
                    self.contributions.extend(report.transitive_dependencies);
                }
                None => {
                    self.contributions.push(dependency.clone());
                    self.descend(coordinate, &record.dependencies, depth)?;
                }
            },
            None => {
                let raw = self.engine.retrieve_raw_dependencies(dependency)?;
                self.contributions.push(dependency.clone());
                let discovered: Vec<ProjectVersion> =
                    raw.into_iter().map(ProjectVersion::from).collect();
                self.descend(coordinate, &discovered, depth)?;
            }
        }
        Ok(())
    }

    fn descend(
        &mut self,
        coordinate: Coordinate,
        dependencies: &[ProjectVersion],
        depth: usize,
    ) -> Result<(), ResolveError> {
        self.path.insert(coordinate.clone());
        let result = dependencies
            .iter()
            .try_for_each(|dependency| self.visit(dependency, depth + 1));
        self.path.remove(&coordinate);
        result
    }
}
