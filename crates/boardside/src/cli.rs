//! Command-line interface for boardside.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Boardside - play a physical chess board against a UCI engine over chat
#[derive(Parser, Debug)]
#[command(name = "boardside")]
#[command(about = "Relay moves from a physical chess board to a chess engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file (defaults apply if it is missing)
    #[arg(short, long, global = true, default_value = "boardside.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP webhook adapter
    Serve {
        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the Telegram bot (long polling)
    Telegram,

    /// Play in the terminal
    Console {
        /// Conversation id to use (resumes a stored game when a database is configured)
        #[arg(long, default_value = "console")]
        conversation: String,
    },

    /// Ask the engine for the best move in a position
    Analyze {
        /// Position in FEN
        fen: String,
    },
}
