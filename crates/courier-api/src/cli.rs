//! CLI argument definitions for the `courier` binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "courier",
    about = "Telegram front-end bot with a session & delivery engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON where applicable
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot until interrupted
    Run,
    /// Show user-base statistics
    Stats,
}
