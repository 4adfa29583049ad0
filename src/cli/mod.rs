//! CLI module for the chartwave planner.
//!
//! This module provides the command-line interface for building,
//! inspecting, and diffing plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
