use crate::cli::{NotificationCommands, StatusArg};
use crate::support;
use chrono::{DateTime, Utc};
use depot_notify::{NotificationEvent, NotificationFilter};
use serde_json::json;
use std::path::Path;

pub fn run(config: Option<&Path>, command: NotificationCommands) {
    match command {
        NotificationCommands::List {
            group,
            artifact,
            version,
            event_id,
            parent,
            status,
            from,
            to,
            json,
        } => {
            let filter = NotificationFilter {
                group_id: group,
                artifact_id: artifact,
                version_id: version,
                event_id,
                parent_event_id: parent,
                success: status.map(|status| matches!(status, StatusArg::Success)),
                completed_from: from.as_deref().map(parse_timestamp_or_exit),
                completed_to: to.as_deref().map(parse_timestamp_or_exit),
            };
            run_list(config, filter, json);
        }
        NotificationCommands::Get { event_id, json } => run_get(config, &event_id, json),
        NotificationCommands::Purge { days, json } => run_purge(config, days, json),
    }
}

fn parse_timestamp_or_exit(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|e| support::exit_with(format!("invalid timestamp `{raw}`: {e}")))
}

fn run_list(config: Option<&Path>, filter: NotificationFilter, json_output: bool) {
    let runtime = support::open_or_exit(config);
    let events = runtime
        .controller
        .archive()
        .find(&filter)
        .unwrap_or_else(|e| support::exit_with(e));

    if json_output {
        support::print_json(&json!({
            "action": "notifications.list",
            "filter": filter,
            "count": events.len(),
            "items": events,
        }));
        return;
    }

    println!("depot notifications list\n  Count: {}", events.len());
    for event in &events {
        println!("  - {}", summary_line(event));
    }
}

fn run_get(config: Option<&Path>, event_id: &str, json_output: bool) {
    let runtime = support::open_or_exit(config);
    let event = runtime
        .controller
        .archive()
        .get(event_id)
        .unwrap_or_else(|e| support::exit_with(e))
        .unwrap_or_else(|| support::exit_with(format!("notification not found: {event_id}")));

    if json_output {
        support::print_json(&json!({
            "action": "notifications.get",
            "event": event,
        }));
        return;
    }

    println!("depot notifications get\n  {}", summary_line(&event));
    if let Some(parent) = &event.parent_event_id {
        println!("  Parent: {parent}");
    }
    for (attempt, response) in event.responses.iter().enumerate() {
        println!("  Attempt {}:", attempt + 1);
        for message in &response.messages {
            println!("    {message}");
        }
        for error in &response.errors {
            println!("    error: {error}");
        }
    }
}

fn run_purge(config: Option<&Path>, days: i64, json_output: bool) {
    if days < 0 {
        support::exit_with("--days must not be negative");
    }
    let runtime = support::open_or_exit(config);
    let removed = runtime
        .controller
        .archive()
        .delete_old_notifications(days)
        .unwrap_or_else(|e| support::exit_with(e));

    if json_output {
        support::print_json(&json!({
            "action": "notifications.purge",
            "days": days,
            "removed": removed,
        }));
    } else {
        println!("depot notifications purge\n  Removed: {removed} (older than {days} days)");
    }
}

fn summary_line(event: &NotificationEvent) -> String {
    let completed = event
        .completed
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} {}:{}:{} attempt {}/{} completed {}",
        event.event_id,
        event.status,
        event.group_id,
        event.artifact_id,
        event.version_id,
        event.attempt,
        event.max_attempts,
        completed
    )
}
