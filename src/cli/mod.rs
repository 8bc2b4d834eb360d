//! CLI command definitions for config-chain.
//!
//! The tool loads a manifest, constructs its namespace through the
//! process-wide registry and resolves items from the command line.

use clap::{Parser, Subcommand};

/// Resolve configuration items declared in a manifest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to manifest file (overrides discovery)
    #[arg(short, long, global = true)]
    pub manifest: Option<String>,

    /// Directory used by `working_dir` locations (overrides manifest)
    #[arg(short = 'C', long, global = true)]
    pub working_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved value of an item
    Get {
        /// Item name
        name: String,
    },

    /// Write a value to every writable backend of an item
    Set {
        /// Item name
        name: String,
        /// Value, parsed as JSON when possible, otherwise taken as a string
        value: String,
    },

    /// Print every item with its resolved value
    List,

    /// Print the backend chain of every item
    Backends,
}
