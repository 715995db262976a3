//! Podium — runtime launcher for the presentation stack.
//!
//! # Usage
//!
//! ```text
//! podium start [--root <dir>] [--backend-port N] [--frontend-port N] [--static-port N] ...
//! podium config show [--json] [--reveal]
//! podium config set [--llm openai|google] [--openai-api-key K] [--google-api-key K]
//! podium serve-static [--dir <dir>] [--bind <addr>] [--port N]
//! podium wait <url> [--interval-secs N] [--timeout-secs N]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, serve_static::ServeStaticArgs, start::StartArgs, wait::WaitArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "podium",
    version,
    about = "Bootstrap config and run the presentation backend, frontend, and asset server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap config, start every service in order, and supervise them.
    Start(StartArgs),

    /// Inspect or update the persisted user config.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Serve the data directory under /user-static in the foreground.
    ServeStatic(ServeStaticArgs),

    /// Block until a URL answers with a success status.
    Wait(WaitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Start(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
        Commands::ServeStatic(args) => args.run(),
        Commands::Wait(args) => args.run(),
    }
}
