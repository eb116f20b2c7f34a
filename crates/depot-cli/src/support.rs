use depot_kernel::{Coordinate, DEFAULT_PROJECT_KIND, ProjectVersion, validate_part};
use depot_notify::{
    DepotConfig, FileListInspector, HandlerRegistry, JsonlArchive, JsonlQueue,
    NotificationController, RefreshHandler,
};
use depot_store::{FixtureRepository, JsonlVersionStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Everything a command needs, wired from `depot.toml`.
pub struct Runtime {
    pub config: DepotConfig,
    pub store: Arc<JsonlVersionStore>,
    pub repository: Arc<FixtureRepository>,
    pub controller: NotificationController,
}

pub fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

pub fn load_config_or_exit(path: Option<&Path>) -> DepotConfig {
    DepotConfig::load(path).unwrap_or_else(|e| exit_with(e))
}

/// Relative paths in the config resolve against the config file's directory.
fn config_base(path: Option<&Path>) -> PathBuf {
    path.and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn open_or_exit(config_path: Option<&Path>) -> Runtime {
    let config = load_config_or_exit(config_path);
    let base = config_base(config_path);
    let storage = config.storage.resolved_against(&base);

    let repository = match &config.repository.fixture {
        Some(fixture) => {
            let fixture = if fixture.is_absolute() {
                fixture.clone()
            } else {
                base.join(fixture)
            };
            FixtureRepository::load(&fixture).unwrap_or_else(|e| {
                exit_with(format!("failed to load repository fixture: {e}"))
            })
        }
        None => {
            tracing::warn!("no [repository] fixture configured; every version is unknown");
            FixtureRepository::default()
        }
    };
    let repository = Arc::new(repository);
    let store = Arc::new(JsonlVersionStore::open(storage.versions_dir));

    let refresh = RefreshHandler::new(store.clone(), repository.clone())
        .with_snapshot_limit(config.refresh.snapshot_limit)
        .with_inspector(Arc::new(FileListInspector));
    let registry =
        HandlerRegistry::new(store.clone()).register(DEFAULT_PROJECT_KIND, Arc::new(refresh));
    let controller = NotificationController::new(
        Arc::new(JsonlQueue::open(storage.queue)),
        Arc::new(JsonlArchive::open(storage.archive)),
        Arc::new(registry),
    )
    .with_max_attempts(config.controller.max_attempts);

    tracing::debug!(
        store = %store.root().display(),
        max_attempts = config.controller.max_attempts,
        snapshot_limit = config.refresh.snapshot_limit,
        "runtime opened"
    );

    Runtime {
        config,
        store,
        repository,
        controller,
    }
}

pub fn parse_gav_or_exit(raw: &str) -> ProjectVersion {
    raw.parse().unwrap_or_else(|e| exit_with(e))
}

pub fn parse_coordinate_or_exit(raw: &str) -> Coordinate {
    let Some((group_id, artifact_id)) = raw.split_once(':') else {
        exit_with(format!("expected group:artifact, got `{raw}`"));
    };
    for (field, value) in [("groupId", group_id), ("artifactId", artifact_id)] {
        if let Err(e) = validate_part(field, value) {
            exit_with(e);
        }
    }
    Coordinate::new(group_id, artifact_id)
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).unwrap_or_else(|e| exit_with(e))
    );
}
