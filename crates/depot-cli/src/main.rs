//! Depot CLI: the `depot` command.

mod cli;
mod commands;
mod support;
mod telemetry;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Notify {
            project_id,
            gav,
            full_update,
            transitive,
            priority,
            json,
        } => commands::notify::run(commands::notify::Args {
            config,
            project_id,
            gav,
            full_update,
            transitive,
            priority,
            json,
        }),

        Commands::Handle { json } => commands::handle::run(config, false, json),

        Commands::Drain { json } => commands::handle::run(config, true, json),

        Commands::Worker { poll_interval_ms } => commands::worker::run(config, poll_interval_ms),

        Commands::Notifications { command } => commands::notifications::run(config, command),

        Commands::Closure {
            gav,
            recompute,
            json,
        } => commands::closure::run(config, gav, recompute, json),

        Commands::Project { command } => commands::project::run(config, command),
    }
}
