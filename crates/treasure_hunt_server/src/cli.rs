//! Command-line interface for the treasure hunt server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Treasure hunt game server
#[derive(Parser, Debug)]
#[command(name = "treasure_hunt")]
#[command(about = "Team treasure hunt with A/B clues, hints and a leaderboard", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, default_value = "treasure_hunt.toml")]
    pub config: PathBuf,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write clues and settings as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace clues and settings from a JSON file
    Import {
        /// Export document to load
        file: PathBuf,
    },

    /// Delete all team progress
    Reset,
}
