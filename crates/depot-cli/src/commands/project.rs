use crate::cli::ProjectCommands;
use crate::support;
use depot_kernel::{ProjectRecord, VersionStore};
use serde_json::json;
use std::path::Path;

pub fn run(config: Option<&Path>, command: ProjectCommands) {
    match command {
        ProjectCommands::Register {
            project_id,
            coordinate,
            kind,
            json,
        } => run_register(config, project_id, &coordinate, kind, json),
    }
}

fn run_register(
    config: Option<&Path>,
    project_id: String,
    coordinate: &str,
    kind: String,
    json_output: bool,
) {
    if project_id.trim().is_empty() {
        support::exit_with("project id is required");
    }
    let coordinate = support::parse_coordinate_or_exit(coordinate);
    let runtime = support::open_or_exit(config);

    let project = runtime
        .store
        .register_project(ProjectRecord::new(project_id, &coordinate).with_kind(kind))
        .unwrap_or_else(|e| support::exit_with(e));

    if json_output {
        support::print_json(&json!({
            "action": "project.register",
            "projectId": project.project_id,
            "coordinate": coordinate.to_string(),
            "kind": project.kind,
        }));
    } else {
        println!(
            "depot project register\n  Project: {}\n  Coordinate: {coordinate}\n  Kind: {}",
            project.project_id, project.kind
        );
    }
}
