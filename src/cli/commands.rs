//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chartwave - declarative chart deployment planner.
#[derive(Parser, Debug)]
#[command(name = "chartwave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the declaration file.
    #[arg(short, long, global = true, env = "CHARTWAVE_FILE")]
    pub file: Option<PathBuf>,

    /// Plan directory.
    #[arg(short, long, global = true, env = "CHARTWAVE_PLANDIR", default_value = ".chartwave")]
    pub plandir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a plan from the declaration.
    Build {
        /// Only include releases carrying these tags.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Require every tag instead of any.
        #[arg(long)]
        match_all_tags: bool,

        /// What to diff the new plan against (local, live, none).
        #[arg(long, default_value = "local")]
        diff_mode: String,
    },

    /// Compare two persisted plans.
    Diff {
        /// Plan directory holding the previous plan.
        #[arg(long, default_value = ".chartwave")]
        old_plandir: PathBuf,
    },

    /// Validate the declaration without building.
    Validate,

    /// Show a persisted plan.
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
