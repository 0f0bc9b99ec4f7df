//! Command-line interface for GC Tracker.

mod commands;

use clap::{Parser, Subcommand};

/// GC Tracker - follows USCIS case statuses and e-mails changes
#[derive(Parser)]
#[command(name = "gctracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server and the status check scheduler
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Run a single status check of every tracked case
    #[command(alias = "-c", alias = "--check")]
    Check,

    /// List every case in the registry
    #[command(alias = "ls")]
    Cases,

    /// List registered users
    Users {
        /// Also show the cases each user tracks
        #[arg(long)]
        with_cases: bool,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
