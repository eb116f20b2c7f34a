//! The refresh handler.
//!
//! Admission: coordinate sanity, project ownership and the per-coordinate
//! snapshot limit. Processing: version existence, raw dependency fetch and
//! validation, transitive fan-out, optional full update, then persistence,
//! closure recomputation and snapshot propagation.

use depot_kernel::{
    ArtifactRepository, ProjectVersion, ResolutionEngine, VersionRecord, VersionStore,
    coordinate_problems, validate_dependencies,
};
use std::sync::Arc;

use crate::event::{NotificationEvent, NotificationResponse};
use crate::handler::{HandlerOutcome, NotificationHandler, RefreshError};
use crate::inspect::{ArtifactInspector, ExtractedProperties, INSPECTED_FILE_KINDS, NoInspection};

pub const DEFAULT_SNAPSHOT_LIMIT: usize = 10;

pub struct RefreshHandler {
    store: Arc<dyn VersionStore>,
    repository: Arc<dyn ArtifactRepository>,
    inspector: Arc<dyn ArtifactInspector>,
    snapshot_limit: usize,
}

impl RefreshHandler {
    pub fn new(store: Arc<dyn VersionStore>, repository: Arc<dyn ArtifactRepository>) -> Self {
        Self {
            store,
            repository,
            inspector: Arc::new(NoInspection),
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }

    pub fn with_snapshot_limit(mut self, snapshot_limit: usize) -> Self {
        self.snapshot_limit = snapshot_limit;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ArtifactInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    fn engine(&self) -> ResolutionEngine<'_, dyn VersionStore, dyn ArtifactRepository> {
        ResolutionEngine::new(self.store.as_ref(), self.repository.as_ref())
    }

    /// Tracked snapshots bypass the limit; evicted ones do not count.
    fn check_snapshot_limit(&self, version: &ProjectVersion) -> Result<(), String> {
        let coordinate = version.coordinate();
        let tracked = self
            .store
            .find_snapshot_versions(&coordinate)
            .map_err(|err| err.to_string())?;
        if tracked.iter().any(|record| record.version == *version) {
            return Ok(());
        }
        let active = tracked.iter().filter(|record| !record.evicted).count();
        if active >= self.snapshot_limit {
            return Err(format!(
                "Snapshot limit reached for {coordinate} ({})",
                self.snapshot_limit
            ));
        }
        Ok(())
    }

    /// Child refreshes for snapshot dependencies that are untracked or excluded.
    fn transitive_children(
        &self,
        event: &NotificationEvent,
        dependencies: &[ProjectVersion],
    ) -> Result<Vec<NotificationEvent>, RefreshError> {
        let mut children = Vec::new();
        for dependency in dependencies.iter().filter(|d| d.is_snapshot()) {
            if let Some(record) = self.store.find(dependency)?
                && !record.excluded
            {
                continue;
            }
            let project = self
                .store
                .find_project(&dependency.coordinate())?
                .ok_or_else(|| RefreshError::MissingDependentProject(dependency.gav()))?;
            children.push(
                NotificationEvent::new(project.project_id, dependency)
                    .with_transitive(true)
                    .with_full_update(event.full_update)
                    .with_priority(event.priority)
                    .with_max_attempts(event.max_attempts)
                    .with_parent(&event.event_id),
            );
        }
        Ok(children)
    }

    fn inspect(&self, version: &ProjectVersion) -> Result<ExtractedProperties, RefreshError> {
        let mut files = Vec::new();
        for kind in INSPECTED_FILE_KINDS {
            files.extend(self.repository.find_files(kind, version)?);
        }
        self.inspector.inspect(version, &files)
    }
}

impl NotificationHandler for RefreshHandler {
    fn validate(&self, event: &NotificationEvent) -> Vec<String> {
        let mut errors = Vec::new();
        if event.project_id.trim().is_empty() {
            errors.push("projectId is required".to_string());
        }

        let version = event.version();
        let problems = coordinate_problems(&version);
        if !problems.is_empty() {
            errors.extend(problems.iter().map(ToString::to_string));
            return errors;
        }

        let coordinate = version.coordinate();
        match self.store.find_project(&coordinate) {
            Ok(Some(project))
                if !event.project_id.is_empty() && project.project_id != event.project_id =>
            {
                errors.push(format!(
                    "Project {} does not own {coordinate}; it belongs to {}",
                    event.project_id, project.project_id
                ));
            }
            Ok(_) => {}
            Err(err) => errors.push(err.to_string()),
        }

        if version.is_snapshot()
            && let Err(message) = self.check_snapshot_limit(&version)
        {
            errors.push(message);
        }
        errors
    }

    fn handle_notification(
        &self,
        event: &NotificationEvent,
    ) -> Result<HandlerOutcome, RefreshError> {
        let version = event.version();
        let engine = self.engine();

        if self
            .repository
            .find_version(&version.coordinate(), &version.version_id)?
            .is_none()
        {
            return Err(RefreshError::VersionNotFound(version.gav()));
        }

        let raw = engine.retrieve_raw_dependencies(&version)?;
        let problems = validate_dependencies(&raw, &version.version_id);
        if !problems.is_empty() {
            return Err(RefreshError::Rejected(problems));
        }
        let dependencies: Vec<ProjectVersion> =
            raw.into_iter().map(ProjectVersion::from).collect();

        let cascade = if event.transitive {
            self.transitive_children(event, &dependencies)?
        } else {
            Vec::new()
        };

        let mut record = self
            .store
            .find(&version)?
            .unwrap_or_else(|| VersionRecord::new(&event.project_id, version.clone()));
        record.project_id = event.project_id.clone();
        record.dependencies = dependencies;
        record.evicted = false;
        if event.full_update {
            let extracted = self.inspect(&version)?;
            record.properties = extracted.properties;
            record.manifest_properties = extracted.manifest_properties;
        }
        let direct = record.dependencies.len();

        let record = engine.resolve_closure(record)?;
        let recomputed = engine.propagate_to_snapshot_dependants(&version)?;

        let (closure, valid) = record
            .transitive
            .as_ref()
            .map(|report| (report.len(), report.valid))
            .unwrap_or((0, true));
        tracing::info!(
            event_id = %event.event_id,
            version = %version,
            direct,
            closure,
            valid,
            recomputed = recomputed.len(),
            cascaded = cascade.len(),
            "version refreshed"
        );

        let mut response = NotificationResponse::new();
        response.message(format!("Refreshed {version}: {direct} direct dependencies"));
        response.message(format!(
            "Transitive closure: {closure} entries ({})",
            if valid { "valid" } else { "invalid" }
        ));
        if !recomputed.is_empty() {
            response.message(format!(
                "Recomputed {} snapshot dependants",
                recomputed.len()
            ));
        }
        if !cascade.is_empty() {
            response.message(format!("Queued {} transitive refreshes", cascade.len()));
        }

        Ok(HandlerOutcome { response, cascade })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::FileListInspector;
    use depot_kernel::{ArtifactDependency, ArtifactFile, ProjectRecord, TransitiveDependencyReport};
    use depot_store::{FixtureRepository, MemoryVersionStore};

    fn v(artifact: &str, version: &str) -> ProjectVersion {
        ProjectVersion::new("org.acme", artifact, version)
    }

    struct Harness {
        store: Arc<MemoryVersionStore>,
        handler: RefreshHandler,
    }

    fn harness(repository: FixtureRepository) -> Harness {
        let store = Arc::new(MemoryVersionStore::default());
        let handler = RefreshHandler::new(store.clone(), Arc::new(repository))
            .with_snapshot_limit(2);
        Harness { store, handler }
    }

    fn register(store: &MemoryVersionStore, project_id: &str, artifact: &str) {
        store
            .register_project(ProjectRecord::new(project_id, &v(artifact, "1.0").coordinate()))
            .expect("project registers");
    }

    fn track(store: &MemoryVersionStore, version: ProjectVersion, evicted: bool) {
        let mut record = VersionRecord::new("p-1", version)
            .with_report(TransitiveDependencyReport::valid(vec![]));
        record.evicted = evicted;
        store.create_or_update(record).expect("record persists");
    }

    #[test]
    fn malformed_coordinates_and_missing_project_are_rejected() {
        let h = harness(FixtureRepository::default());
        let event = NotificationEvent::new("", &ProjectVersion::new("org acme", "core", "1.0"));
        let errors = h.handler.validate(&event);
        assert_eq!(
            errors,
            vec![
                "projectId is required".to_string(),
                "invalid groupId `org acme`".to_string(),
            ]
        );
    }

    #[test]
    fn foreign_project_cannot_refresh_an_owned_coordinate() {
        let h = harness(FixtureRepository::default());
        register(&h.store, "p-1", "core");
        let errors = h
            .handler
            .validate(&NotificationEvent::new("p-2", &v("core", "1.0")));
        assert_eq!(
            errors,
            vec!["Project p-2 does not own org.acme:core; it belongs to p-1".to_string()]
        );
        assert!(
            h.handler
                .validate(&NotificationEvent::new("p-1", &v("core", "1.0")))
                .is_empty()
        );
    }

    #[test]
    fn snapshot_limit_admits_tracked_versions_and_ignores_evicted_ones() {
        let h = harness(FixtureRepository::default());
        track(&h.store, v("core", "a-SNAPSHOT"), false);
        track(&h.store, v("core", "b-SNAPSHOT"), false);
        track(&h.store, v("core", "c-SNAPSHOT"), true);

        let fresh = NotificationEvent::new("p-1", &v("core", "d-SNAPSHOT"));
        assert_eq!(
            h.handler.validate(&fresh),
            vec!["Snapshot limit reached for org.acme:core (2)".to_string()]
        );

        let tracked = NotificationEvent::new("p-1", &v("core", "a-SNAPSHOT"));
        assert!(h.handler.validate(&tracked).is_empty());
        let evicted = NotificationEvent::new("p-1", &v("core", "c-SNAPSHOT"));
        assert!(h.handler.validate(&evicted).is_empty());
        let release = NotificationEvent::new("p-1", &v("core", "9.0"));
        assert!(h.handler.validate(&release).is_empty());
    }

    #[test]
    fn unknown_version_is_a_retryable_failure() {
        let h = harness(FixtureRepository::default());
        let err = h
            .handler
            .handle_notification(&NotificationEvent::new("p-1", &v("ghost", "1.0")))
            .expect_err("unknown version must fail");
        assert_eq!(err.to_string(), "Could not find version org.acme:ghost:1.0");
        assert!(err.is_retryable());
    }

    #[test]
    fn release_depending_on_snapshot_is_rejected() {
        let repository = FixtureRepository::default()
            .with_version(v("core", "1.0"), vec![v("lib", "main-SNAPSHOT")]);
        let h = harness(repository);
        let err = h
            .handler
            .handle_notification(&NotificationEvent::new("p-1", &v("core", "1.0")))
            .expect_err("release on snapshot must fail");
        assert_eq!(
            err,
            RefreshError::Rejected(vec![
                "Snapshot dependency org.acme:lib:main-SNAPSHOT for release version 1.0"
                    .to_string()
            ])
        );
        assert!(h.store.find(&v("core", "1.0")).expect("find").is_none());
    }

    #[test]
    fn refresh_persists_dependencies_and_closure() {
        let repository = FixtureRepository::default()
            .with_version(v("core", "1.0"), vec![v("util", "2.0")])
            .with_version(v("util", "2.0"), vec![v("log", "1.1")])
            .with_version(v("log", "1.1"), vec![]);
        let h = harness(repository);
        let mut stale = VersionRecord::new("p-1", v("core", "1.0"));
        stale.evicted = true;
        h.store.create_or_update(stale).expect("seed");

        let outcome = h
            .handler
            .handle_notification(&NotificationEvent::new("p-1", &v("core", "1.0")))
            .expect("refresh should succeed");
        assert!(!outcome.response.has_errors());
        assert!(outcome.cascade.is_empty());
        assert_eq!(
            outcome.response.messages[0],
            "Refreshed org.acme:core:1.0: 1 direct dependencies"
        );

        let record = h
            .store
            .find(&v("core", "1.0"))
            .expect("find")
            .expect("record exists");
        assert!(!record.evicted);
        assert_eq!(record.dependencies, vec![v("util", "2.0")]);
        assert_eq!(
            record.transitive,
            Some(TransitiveDependencyReport::valid(vec![
                v("util", "2.0"),
                v("log", "1.1")
            ]))
        );
    }

    #[test]
    fn transitive_refresh_fans_out_to_untracked_and_excluded_snapshots() {
        let repository = FixtureRepository::default()
            .with_version(
                v("app", "main-SNAPSHOT"),
                vec![
                    v("fresh", "main-SNAPSHOT"),
                    v("known", "main-SNAPSHOT"),
                    v("banned", "main-SNAPSHOT"),
                    v("util", "1.0"),
                ],
            );
        let h = harness(repository);
        register(&h.store, "p-fresh", "fresh");
        register(&h.store, "p-known", "known");
        register(&h.store, "p-banned", "banned");
        track(&h.store, v("known", "main-SNAPSHOT"), false);
        let mut banned = VersionRecord::new("p-banned", v("banned", "main-SNAPSHOT"));
        banned.exclude("broken build");
        h.store.create_or_update(banned).expect("seed");

        let parent = NotificationEvent::new("p-1", &v("app", "main-SNAPSHOT")).with_transitive(true);
        let outcome = h
            .handler
            .handle_notification(&parent)
            .expect("refresh should succeed");

        let children: Vec<(String, String, Option<String>)> = outcome
            .cascade
            .iter()
            .map(|child| {
                (
                    child.project_id.clone(),
                    child.artifact_id.clone(),
                    child.parent_event_id.clone(),
                )
            })
            .collect();
        assert_eq!(
            children,
            vec![
                ("p-fresh".to_string(), "fresh".to_string(), Some(parent.event_id.clone())),
                ("p-banned".to_string(), "banned".to_string(), Some(parent.event_id.clone())),
            ]
        );
        assert!(outcome.cascade.iter().all(|child| child.transitive));
    }

    #[test]
    fn transitive_refresh_fails_without_a_dependent_project() {
        let repository = FixtureRepository::default()
            .with_version(v("app", "main-SNAPSHOT"), vec![v("orphan", "main-SNAPSHOT")]);
        let h = harness(repository);
        let event = NotificationEvent::new("p-1", &v("app", "main-SNAPSHOT")).with_transitive(true);

        let err = h
            .handler
            .handle_notification(&event)
            .expect_err("missing project must fail");
        assert_eq!(
            err.to_string(),
            "Could not find dependent project: [org.acme:orphan:main-SNAPSHOT]"
        );
        assert!(err.is_retryable());
        assert!(h.store.find(&v("app", "main-SNAPSHOT")).expect("find").is_none());
    }

    #[test]
    fn full_update_stores_extracted_properties() {
        let mut repository = FixtureRepository::default();
        repository.publish_with_files(
            v("core", "1.0"),
            Vec::<ArtifactDependency>::new(),
            vec![ArtifactFile {
                kind: "jar".to_string(),
                name: "core-1.0.jar".to_string(),
                location: String::new(),
            }],
        );
        let store = Arc::new(MemoryVersionStore::default());
        let handler = RefreshHandler::new(store.clone(), Arc::new(repository))
            .with_inspector(Arc::new(FileListInspector));

        handler
            .handle_notification(
                &NotificationEvent::new("p-1", &v("core", "1.0")).with_full_update(true),
            )
            .expect("refresh should succeed");
        let record = store
            .find(&v("core", "1.0"))
            .expect("find")
            .expect("record exists");
        assert_eq!(
            record.properties.get("files.jar").map(String::as_str),
            Some("core-1.0.jar")
        );
    }

    #[test]
    fn snapshot_refresh_recomputes_dependants() {
        let repository = FixtureRepository::default()
            .with_version(v("core", "main-SNAPSHOT"), vec![v("util", "2.0")])
            .with_version(v("util", "2.0"), vec![]);
        let h = harness(repository);
        h.store
            .create_or_update(
                VersionRecord::new("p-2", v("app", "main-SNAPSHOT"))
                    .with_dependencies(vec![v("core", "main-SNAPSHOT")]),
            )
            .expect("seed");

        let outcome = h
            .handler
            .handle_notification(&NotificationEvent::new("p-1", &v("core", "main-SNAPSHOT")))
            .expect("refresh should succeed");
        assert!(
            outcome
                .response
                .messages
                .contains(&"Recomputed 1 snapshot dependants".to_string())
        );
        let app = h
            .store
            .find(&v("app", "main-SNAPSHOT"))
            .expect("find")
            .expect("record exists");
        assert_eq!(
            app.transitive,
            Some(TransitiveDependencyReport::valid(vec![
                v("core", "main-SNAPSHOT"),
                v("util", "2.0")
            ]))
        );
    }
}
