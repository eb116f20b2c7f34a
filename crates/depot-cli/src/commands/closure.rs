use crate::support;
use depot_kernel::{ProjectVersion, ResolutionEngine, VersionStore};
use serde_json::json;
use std::path::Path;

pub fn run(config: Option<&Path>, gav: String, recompute: bool, json_output: bool) {
    let version = support::parse_gav_or_exit(&gav);
    let runtime = support::open_or_exit(config);

    let mut record = runtime
        .store
        .find(&version)
        .unwrap_or_else(|e| support::exit_with(e))
        .unwrap_or_else(|| support::exit_with(format!("version not tracked: {version}")));

    if recompute {
        let engine = ResolutionEngine::new(runtime.store.as_ref(), runtime.repository.as_ref());
        record = engine
            .resolve_closure(record)
            .unwrap_or_else(|e| support::exit_with(e));
    }

    let gavs = |versions: &[ProjectVersion]| -> Vec<String> {
        versions.iter().map(ProjectVersion::gav).collect()
    };
    let closure = record
        .transitive
        .as_ref()
        .map(|report| gavs(report.transitive_dependencies.as_slice()));
    let valid = record.transitive.as_ref().map(|report| report.valid);

    if json_output {
        support::print_json(&json!({
            "action": "closure",
            "version": version.gav(),
            "projectId": record.project_id,
            "dependencies": gavs(record.dependencies.as_slice()),
            "excluded": record.excluded,
            "evicted": record.evicted,
            "valid": valid,
            "closure": closure,
            "updatedAt": record.updated_at.to_rfc3339(),
        }));
        return;
    }

    println!("depot closure\n  Version: {version}");
    if record.excluded {
        println!("  Excluded: {}", record.exclusion_reason);
    }
    match (closure, valid) {
        (Some(closure), Some(valid)) => {
            println!(
                "  Valid: {valid}\n  Closure ({}):",
                closure.len()
            );
            for entry in closure {
                println!("    - {entry}");
            }
        }
        _ => println!("  Closure: not computed"),
    }
}
