use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "depot",
    about = "Depot: transitive dependency resolution and refresh queue for an artifact registry",
    version
)]
pub struct Cli {
    /// Path to depot.toml (defaults to ./depot.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); DEPOT_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and queue a refresh of one version
    Notify {
        /// Owning project ID
        project_id: String,

        /// Version as group:artifact:version
        gav: String,

        /// Also extract properties from the version's published files
        #[arg(long)]
        full_update: bool,

        /// Cascade refreshes to untracked snapshot dependencies
        #[arg(long)]
        transitive: bool,

        /// Event priority
        #[arg(long, value_enum, default_value = "high")]
        priority: PriorityArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Handle the oldest queued event
    Handle {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Handle queued events until the queue is empty
    Drain {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drain the queue on a fixed interval until Ctrl-C
    Worker {
        /// Poll interval in milliseconds (overrides [worker] poll_interval_ms)
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Query and purge archived notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// Show the transitive closure stored for a version
    Closure {
        /// Version as group:artifact:version
        gav: String,

        /// Recompute and persist the closure before printing it
        #[arg(long)]
        recompute: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage project ownership of coordinates
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum NotificationCommands {
    /// List archived notifications
    List {
        #[arg(long)]
        group: Option<String>,

        #[arg(long)]
        artifact: Option<String>,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        event_id: Option<String>,

        /// Only children of this event
        #[arg(long)]
        parent: Option<String>,

        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Completed at or after (RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Completed at or before (RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one archived notification
    Get {
        event_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete notifications completed more than N days ago
    Purge {
        #[arg(long)]
        days: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ProjectCommands {
    /// Register a project as the owner of group:artifact
    Register {
        project_id: String,

        /// Coordinate as group:artifact
        coordinate: String,

        /// Handler kind
        #[arg(long, default_value = "library")]
        kind: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PriorityArg {
    #[value(name = "low")]
    Low,
    #[value(name = "normal")]
    Normal,
    #[value(name = "high")]
    High,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    #[value(name = "success")]
    Success,
    #[value(name = "failed")]
    Failed,
}
