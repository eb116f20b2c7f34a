use crate::cli::PriorityArg;
use crate::support;
use depot_notify::{NotifyError, NotifyRequest, Priority};
use serde_json::json;
use std::path::Path;

pub struct Args<'a> {
    pub config: Option<&'a Path>,
    pub project_id: String,
    pub gav: String,
    pub full_update: bool,
    pub transitive: bool,
    pub priority: PriorityArg,
    pub json: bool,
}

pub fn run(args: Args<'_>) {
    let version = support::parse_gav_or_exit(&args.gav);
    let runtime = support::open_or_exit(args.config);

    let request = NotifyRequest {
        full_update: args.full_update,
        transitive: args.transitive,
        priority: map_priority(args.priority),
        ..NotifyRequest::new(args.project_id.clone(), version.clone())
    };

    let event_id = match runtime.controller.notify_with(request) {
        Ok(event_id) => event_id,
        Err(NotifyError::Validation(errors)) => {
            if args.json {
                support::print_json(&json!({
                    "action": "notify",
                    "accepted": false,
                    "errors": errors,
                }));
                std::process::exit(1);
            }
            support::exit_with(format!("notification rejected: {}", errors.join("; ")))
        }
        Err(err) => support::exit_with(err),
    };

    let queued = runtime
        .controller
        .queue()
        .size()
        .unwrap_or_else(|e| support::exit_with(e));

    if args.json {
        support::print_json(&json!({
            "action": "notify",
            "accepted": true,
            "eventId": event_id,
            "projectId": args.project_id,
            "version": version.gav(),
            "fullUpdate": args.full_update,
            "transitive": args.transitive,
            "queued": queued,
        }));
    } else {
        println!(
            "depot notify\n  Event: {event_id}\n  Version: {version}\n  Queued: {queued}"
        );
    }
}

fn map_priority(priority: PriorityArg) -> Priority {
    match priority {
        PriorityArg::Low => Priority::Low,
        PriorityArg::Normal => Priority::Normal,
        PriorityArg::High => Priority::High,
    }
}
