//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying plans and
//! diff reports to the user in text or JSON.

use serde::Serialize;

use crate::plan::{DiffReport, Plan};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// JSON projection of a plan.
#[derive(Serialize)]
struct PlanJson<'a> {
    project: &'a str,
    version: &'a str,
    repositories: Vec<&'a str>,
    releases: Vec<String>,
}

impl<'a> From<&'a Plan> for PlanJson<'a> {
    fn from(plan: &'a Plan) -> Self {
        Self {
            project: &plan.body().project,
            version: &plan.body().version,
            repositories: plan
                .body()
                .repositories
                .iter()
                .map(|r| r.name.as_str())
                .collect(),
            releases: plan.releases().iter().map(crate::config::ReleaseConfig::uniq).collect(),
        }
    }
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => plan.pretty(),
        }
    }

    /// Formats a diff report for display.
    #[must_use]
    pub fn format_diff(&self, report: &DiffReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => report.pretty(),
        }
    }
}
