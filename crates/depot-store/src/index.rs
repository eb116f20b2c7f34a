//! Reverse dependency index: which versions declare a dependency on a version.

use depot_kernel::{ProjectVersion, VersionRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Incoming edges keyed by the depended-on version.
#[derive(Debug, Clone, Default)]
pub struct DependantIndex {
    incoming: BTreeMap<ProjectVersion, BTreeSet<ProjectVersion>>,
}

impl DependantIndex {
    /// Build the index from every record's declared dependencies.
    pub fn hydrate<'a>(records: impl IntoIterator<Item = &'a VersionRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Replace the edges contributed by `previous` with those of `current`.
    pub fn replace(&mut self, previous: Option<&VersionRecord>, current: &VersionRecord) {
        if let Some(previous) = previous {
            self.remove(previous);
        }
        self.insert(current);
    }

    fn insert(&mut self, record: &VersionRecord) {
        for dependency in &record.dependencies {
            self.incoming
                .entry(dependency.clone())
                .or_default()
                .insert(record.version.clone());
        }
    }

    fn remove(&mut self, record: &VersionRecord) {
        for dependency in &record.dependencies {
            if let Some(dependants) = self.incoming.get_mut(dependency) {
                dependants.remove(&record.version);
                if dependants.is_empty() {
                    self.incoming.remove(dependency);
                }
            }
        }
    }

    /// Versions declaring a direct dependency on `version`, in version order.
    pub fn dependants_of(&self, version: &ProjectVersion) -> Vec<&ProjectVersion> {
        self.incoming
            .get(version)
            .map(|dependants| dependants.iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(artifact: &str, version: &str) -> ProjectVersion {
        ProjectVersion::new("org.acme", artifact, version)
    }

    #[test]
    fn replace_drops_stale_edges() {
        let first = VersionRecord::new("p", v("app", "main-SNAPSHOT"))
            .with_dependencies(vec![v("core", "1.0")]);
        let mut index = DependantIndex::hydrate([&first]);
        assert_eq!(index.dependants_of(&v("core", "1.0")), vec![&v("app", "main-SNAPSHOT")]);

        let second = VersionRecord::new("p", v("app", "main-SNAPSHOT"))
            .with_dependencies(vec![v("core", "2.0")]);
        index.replace(Some(&first), &second);
        assert!(index.dependants_of(&v("core", "1.0")).is_empty());
        assert_eq!(index.dependants_of(&v("core", "2.0")), vec![&v("app", "main-SNAPSHOT")]);
    }
}
