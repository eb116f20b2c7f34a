use crate::support;
use serde_json::json;
use std::path::Path;

/// `depot handle` (one event) and `depot drain` (until empty).
pub fn run(config: Option<&Path>, drain: bool, json_output: bool) {
    let runtime = support::open_or_exit(config);
    let controller = &runtime.controller;

    let handled = if drain {
        controller.handle_all()
    } else {
        controller.handle()
    }
    .unwrap_or_else(|e| support::exit_with(e));

    let queued = controller
        .queue()
        .size()
        .unwrap_or_else(|e| support::exit_with(e));

    let action = if drain { "drain" } else { "handle" };
    if json_output {
        support::print_json(&json!({
            "action": action,
            "handled": handled,
            "queued": queued,
        }));
    } else {
        println!("depot {action}\n  Handled: {handled}\n  Still queued: {queued}");
    }
}
