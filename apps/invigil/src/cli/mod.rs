//! # Invigil CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show dataset summary
//! - `stats` - Show per-teacher workload
//! - `program` - Print the exam program
//! - `notice` - Print a teacher's assignment notice
//! - `available` - List teachers free for a seat at a slot
//! - `export` - Export the dataset as JSON
//! - `import` - Replace the dataset from JSON
//! - `init` - Create a fresh dataset
//! - `reset` - Delete all exams and teachers, keeping settings

mod commands;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use invigil_core::{InvigilError, Role};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Invigil - exam proctor and examiner assignment
///
/// Seats teachers as examiners and proctors without double-booking anyone
/// at the same date and time.
#[derive(Parser, Debug)]
#[command(name = "invigil")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML config file (default: ./invigil.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend: "file" (JSON documents) or "redb" (embedded database)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<Backend>,

    /// Data directory (file backend) or database file (redb backend)
    #[arg(short = 'D', long, global = true)]
    pub data: Option<PathBuf>,

    /// Owner key selecting the dataset
    #[arg(short = 'O', long, global = true)]
    pub owner: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show dataset summary
    Status,

    /// Show per-teacher workload, busiest first
    Stats,

    /// Print the exam program ordered by date and time
    Program,

    /// Print a teacher's assignment notice
    Notice {
        /// Teacher id
        #[arg(short, long)]
        teacher: u64,
    },

    /// List teachers that may fill a seat at a slot
    Available {
        /// Exam date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Exam time (HH:MM)
        #[arg(short, long)]
        time: String,

        /// Seat role (examiner, proctor)
        #[arg(short, long, default_value = "proctor")]
        role: Role,

        /// Seat index within the role
        #[arg(short, long, default_value = "0")]
        slot: usize,

        /// Exam being edited; its own seats do not count as bookings
        #[arg(short, long)]
        exclude: Option<u64>,
    },

    /// Export the dataset as a JSON document
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace the dataset from a JSON document
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Create a fresh dataset (default settings, one sample teacher)
    Init {
        /// Overwrite an existing dataset
        #[arg(short, long)]
        force: bool,
    },

    /// Delete all exams and teachers, keeping settings
    Reset,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Load the config and apply the global flags over it.
    pub fn resolve_config(&self) -> Result<Config, InvigilError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        if let Some(data) = &self.data {
            config.storage.path.clone_from(data);
        }
        if let Some(owner) = &self.owner {
            config.storage.owner_key.clone_from(owner);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), InvigilError> {
    let mut config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Stats) => cmd_stats(&config, json_mode),
        Some(Commands::Program) => cmd_program(&config, json_mode),
        Some(Commands::Notice { teacher }) => cmd_notice(&config, json_mode, teacher),
        Some(Commands::Available {
            date,
            time,
            role,
            slot,
            exclude,
        }) => cmd_available(&config, json_mode, &date, &time, role, slot, exclude),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Reset) => cmd_reset(&config),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
