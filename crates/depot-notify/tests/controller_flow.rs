//! Integration tests: controller + registry + refresh handler over the
//! store adapters and a fixture repository.

use depot_kernel::{ProjectRecord, ProjectVersion, TransitiveDependencyReport, VersionRecord, VersionStore};
use depot_notify::{
    Disposition, EventStatus, HandlerRegistry, JsonlArchive, JsonlQueue, MemoryArchive,
    MemoryQueue, NotificationArchive, NotificationController, NotificationEvent,
    NotificationFilter, NotificationQueue, NotifyError, NotifyRequest, RefreshHandler,
};
use depot_store::{FixtureRepository, JsonlVersionStore, MemoryVersionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn v(artifact: &str, version: &str) -> ProjectVersion {
    ProjectVersion::new("org.acme", artifact, version)
}

struct Stack {
    controller: NotificationController,
    store: Arc<MemoryVersionStore>,
    queue: Arc<MemoryQueue>,
    archive: Arc<MemoryArchive>,
    repository: Arc<FixtureRepository>,
}

fn stack(repository: FixtureRepository, max_attempts: u32, snapshot_limit: usize) -> Stack {
    let store = Arc::new(MemoryVersionStore::default());
    let queue = Arc::new(MemoryQueue::new());
    let archive = Arc::new(MemoryArchive::new());
    let repository = Arc::new(repository);
    let refresh = RefreshHandler::new(store.clone(), repository.clone())
        .with_snapshot_limit(snapshot_limit);
    let registry = HandlerRegistry::new(store.clone()).register("library", Arc::new(refresh));
    let controller = NotificationController::new(queue.clone(), archive.clone(), Arc::new(registry))
        .with_max_attempts(max_attempts);
    Stack {
        controller,
        store,
        queue,
        archive,
        repository,
    }
}

fn archived(archive: &dyn NotificationArchive) -> Vec<NotificationEvent> {
    archive
        .find(&NotificationFilter::default())
        .expect("find should succeed")
}

#[test]
fn handle_on_empty_queue_is_a_no_op() {
    let s = stack(FixtureRepository::default(), 3, 10);
    assert_eq!(s.controller.handle().expect("handle"), 0);
    assert!(s.repository.dependency_calls().is_empty());
    assert!(s.archive.is_empty());
}

#[test]
fn malformed_notify_never_reaches_the_queue() {
    let s = stack(FixtureRepository::default(), 3, 10);
    let err = s
        .controller
        .notify("p-1", "org.acme", "core lib", "1.0")
        .expect_err("malformed artifact id must be rejected");
    assert!(matches!(err, NotifyError::Validation(_)));
    assert_eq!(err.to_string(), "invalid artifactId `core lib`");
    assert_eq!(s.queue.size().expect("size"), 0);
}

#[test]
fn successful_refresh_is_archived_with_closure_persisted() {
    let repository = FixtureRepository::default()
        .with_version(v("core", "1.0"), vec![v("util", "2.0")])
        .with_version(v("util", "2.0"), vec![]);
    let s = stack(repository, 3, 10);

    let id = s
        .controller
        .notify("p-1", "org.acme", "core", "1.0")
        .expect("notify should succeed");
    assert_eq!(s.controller.handle().expect("handle"), 1);

    let event = s.archive.get(&id).expect("get").expect("archived");
    assert_eq!(event.status, EventStatus::Success);
    assert_eq!(event.attempt, 1);
    assert!(event.completed.is_some());

    let record = s
        .store
        .find(&v("core", "1.0"))
        .expect("find")
        .expect("record persisted");
    assert_eq!(
        record.transitive,
        Some(TransitiveDependencyReport::valid(vec![v("util", "2.0")]))
    );
}

#[test]
fn validation_failure_is_archived_after_exactly_one_attempt() {
    let s = stack(FixtureRepository::default(), 5, 1);
    s.store
        .create_or_update(VersionRecord::new("p-1", v("core", "a-SNAPSHOT")))
        .expect("seed");

    s.queue
        .push(NotificationEvent::new("p-1", &v("core", "b-SNAPSHOT")).with_max_attempts(5))
        .expect("push");
    let report = s
        .controller
        .handle_event(
            s.queue
                .get_first_in_queue()
                .expect("pop")
                .expect("queued event"),
        )
        .expect("handle_event");
    assert_eq!(report.disposition, Disposition::Failed);
    assert_eq!(report.attempt, 1);

    let events = archived(s.archive.as_ref());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(events[0].attempt, 1);
    assert_eq!(
        events[0].current_response.as_ref().map(|r| r.errors.clone()),
        Some(vec!["Snapshot limit reached for org.acme:core (1)".to_string()])
    );
    assert_eq!(s.queue.size().expect("size"), 0);
    assert!(s.repository.dependency_calls().is_empty());
}

#[test]
fn handler_failure_with_attempts_left_is_requeued_not_archived() {
    let s = stack(
        FixtureRepository::default().with_version(v("core", "1.0"), vec![]),
        3,
        10,
    );
    let id = s
        .controller
        .notify("p-1", "org.acme", "core", "1.0")
        .expect("notify should succeed");
    s.repository.set_unavailable(true);

    assert_eq!(s.controller.handle().expect("handle"), 1);
    assert!(s.archive.is_empty());

    let queued = s.queue.get_all().expect("get_all");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].event_id, id);
    assert_eq!(queued[0].attempt, 1);
    assert_eq!(queued[0].status, EventStatus::Pending);
    assert_eq!(queued[0].responses.len(), 1);
    assert_eq!(
        queued[0].responses[0].errors,
        vec!["repository unavailable: fixture repository offline".to_string()]
    );
}

#[test]
fn handler_failure_at_max_attempts_is_archived_failed_once() {
    let s = stack(
        FixtureRepository::default().with_version(v("core", "1.0"), vec![]),
        2,
        10,
    );
    s.controller
        .notify("p-1", "org.acme", "core", "1.0")
        .expect("notify should succeed");
    s.repository.set_unavailable(true);

    assert_eq!(s.controller.handle_all().expect("drain"), 2);
    assert_eq!(s.queue.size().expect("size"), 0);

    let events = archived(s.archive.as_ref());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(events[0].attempt, 2);
    assert_eq!(events[0].responses.len(), 2);
}

#[test]
fn transient_failure_recovers_on_retry() {
    let repository = FixtureRepository::default().with_version(v("core", "1.0"), vec![]);
    repository.fail_dependencies_of(v("core", "1.0"));
    let s = stack(repository, 3, 10);
    let id = s
        .controller
        .notify("p-1", "org.acme", "core", "1.0")
        .expect("notify should succeed");

    assert_eq!(s.controller.handle().expect("handle"), 1);
    s.repository.heal();
    assert_eq!(s.controller.handle().expect("handle"), 1);

    let event = s.archive.get(&id).expect("get").expect("archived");
    assert_eq!(event.status, EventStatus::Success);
    assert_eq!(event.attempt, 2);
    assert!(event.responses[0].has_errors());
}

#[test]
fn transitive_snapshot_refresh_cascades_one_child() {
    let repository = FixtureRepository::default()
        .with_version(v("app", "main-SNAPSHOT"), vec![v("lib", "main-SNAPSHOT"), v("util", "1.0")])
        .with_version(v("lib", "main-SNAPSHOT"), vec![v("util", "1.0")])
        .with_version(v("util", "1.0"), vec![]);
    let s = stack(repository, 3, 10);
    s.store
        .register_project(ProjectRecord::new("p-lib", &v("lib", "1.0").coordinate()))
        .expect("project registers");

    let parent_id = s
        .controller
        .notify_with(NotifyRequest {
            transitive: true,
            ..NotifyRequest::new("p-app", v("app", "main-SNAPSHOT"))
        })
        .expect("notify should succeed");
    assert_eq!(s.controller.handle().expect("handle"), 1);

    let queued = s.queue.get_all().expect("get_all");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].parent_event_id.as_deref(), Some(parent_id.as_str()));
    assert_eq!(queued[0].project_id, "p-lib");
    assert_eq!(queued[0].version(), v("lib", "main-SNAPSHOT"));

    assert_eq!(s.controller.handle_all().expect("drain"), 1);
    let children = s
        .archive
        .find(&NotificationFilter {
            parent_event_id: Some(parent_id.clone()),
            ..NotificationFilter::default()
        })
        .expect("find");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].status, EventStatus::Success);

    // The parent was resolved before lib was tracked; the child refresh
    // propagated lib's closure back into it.
    let app = s
        .store
        .find(&v("app", "main-SNAPSHOT"))
        .expect("find")
        .expect("record persisted");
    let report = app.transitive.expect("app carries a report");
    assert!(report.valid);
    assert_eq!(report.transitive_dependencies, vec![v("lib", "main-SNAPSHOT"), v("util", "1.0")]);
}

#[test]
fn missing_dependent_project_is_retried_then_failed() {
    let repository = FixtureRepository::default()
        .with_version(v("app", "main-SNAPSHOT"), vec![v("orphan", "main-SNAPSHOT")]);
    let s = stack(repository, 2, 10);
    s.controller
        .notify_with(NotifyRequest {
            transitive: true,
            ..NotifyRequest::new("p-app", v("app", "main-SNAPSHOT"))
        })
        .expect("notify should succeed");

    assert_eq!(s.controller.handle_all().expect("drain"), 2);
    let events = archived(s.archive.as_ref());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(
        events[0].current_response.as_ref().map(|r| r.errors.clone()),
        Some(vec![
            "Could not find dependent project: [org.acme:orphan:main-SNAPSHOT]".to_string()
        ])
    );
}

fn temp_root(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "depot-flow-{prefix}-{}-{unique}",
        std::process::id()
    ))
}

#[test]
fn jsonl_stack_survives_restart_between_notify_and_drain() {
    let root = temp_root("restart");
    let repository = Arc::new(
        FixtureRepository::default()
            .with_version(v("core", "1.0"), vec![v("util", "2.0")])
            .with_version(v("util", "2.0"), vec![]),
    );
    let build = || {
        let store = Arc::new(JsonlVersionStore::open(root.join("store")));
        let refresh = RefreshHandler::new(store.clone(), repository.clone());
        let registry = HandlerRegistry::new(store).register("library", Arc::new(refresh));
        NotificationController::new(
            Arc::new(JsonlQueue::open(root.join("queue.jsonl"))),
            Arc::new(JsonlArchive::open(root.join("archive.jsonl"))),
            Arc::new(registry),
        )
    };

    let id = build()
        .notify("p-1", "org.acme", "core", "1.0")
        .expect("notify should succeed");

    let restarted = build();
    assert_eq!(restarted.queue().size().expect("size"), 1);
    assert_eq!(restarted.handle_all().expect("drain"), 1);
    assert_eq!(restarted.queue().size().expect("size"), 0);

    let event = build()
        .archive()
        .get(&id)
        .expect("get")
        .expect("archived");
    assert_eq!(event.status, EventStatus::Success);

    let store = JsonlVersionStore::open(root.join("store"));
    let record = store
        .find(&v("core", "1.0"))
        .expect("find")
        .expect("record persisted");
    assert_eq!(record.dependencies, vec![v("util", "2.0")]);

    let _ = std::fs::remove_dir_all(root);
}
