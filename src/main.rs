//! Chartwave CLI entrypoint.
//!
//! This is the main entrypoint for the chartwave command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chartwave::cli::{Cli, Commands, OutputFormatter};
use chartwave::config::{DEFAULT_DECLARATION_FILE, DeclarationBody, FileTemplater, Templater};
use chartwave::error::Result;
use chartwave::plan::{DiffEngine, Plan, PlanBuilder, validate_unique_releases};
use chartwave::registry::RepositoryRegistry;

use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Build {
            tags,
            match_all_tags,
            diff_mode,
        } => {
            cmd_build(
                cli.file.as_deref(),
                &cli.plandir,
                tags,
                match_all_tags,
                &diff_mode,
                &formatter,
            )
            .await
        }
        Commands::Diff { old_plandir } => cmd_diff(&cli.plandir, &old_plandir, &formatter),
        Commands::Validate => cmd_validate(cli.file.as_deref()),
        Commands::Show => cmd_show(&cli.plandir, &formatter),
    }
}

/// Build a plan, then diff it against the previous one.
async fn cmd_build(
    file: Option<&Path>,
    plandir: &Path,
    tags: Vec<String>,
    match_all_tags: bool,
    diff_mode: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let declaration = load_declaration(file)?;

    // The build overwrites the planfile, so the previous plan has to
    // be read into memory first.
    let old_plan = if Plan::exists(plandir) {
        Some(Plan::import(plandir)?)
    } else {
        None
    };

    let plan = PlanBuilder::new(plandir)
        .with_tags(tags)
        .match_all_tags(match_all_tags)
        .build(declaration)
        .await?;

    eprintln!("{}", formatter.format_plan(&plan));

    match diff_mode {
        "local" => {
            if let Some(old) = &old_plan {
                let report = DiffEngine::new().diff_plans(old, &plan)?;
                eprintln!("{}", formatter.format_diff(&report));
            } else {
                eprintln!("No previous plan to compare against.");
            }
        }
        "none" => {}
        "live" => warn!("Live diffing requires a connected manifest provider, skipping"),
        other => warn!("Unknown diff mode {other}, skipping diffing"),
    }

    Ok(())
}

/// Compare the plan at `plandir` against a previously persisted one.
fn cmd_diff(plandir: &Path, old_plandir: &Path, formatter: &OutputFormatter) -> Result<()> {
    let old = Plan::import(old_plandir)?;
    let new = Plan::import(plandir)?;

    let report = DiffEngine::new().diff_plans(&old, &new)?;
    eprintln!("{}", formatter.format_diff(&report));

    Ok(())
}

/// Validate the declaration without building a plan.
fn cmd_validate(file: Option<&Path>) -> Result<()> {
    let declaration = load_declaration(file)?;

    let mut registry = RepositoryRegistry::new();
    for repo in declaration.repositories {
        registry.add(repo)?;
    }

    validate_unique_releases(&declaration.releases)?;

    eprintln!("Declaration is valid!");
    eprintln!("  Project: {}", declaration.project);
    eprintln!("  Repositories: {}", registry.len());
    eprintln!("  Releases: {}", declaration.releases.len());

    Ok(())
}

/// Show a persisted plan.
fn cmd_show(plandir: &Path, formatter: &OutputFormatter) -> Result<()> {
    let plan = Plan::import(plandir)?;
    eprintln!("{}", formatter.format_plan(&plan));
    Ok(())
}

/// Loads and parses the declaration file.
fn load_declaration(file: Option<&Path>) -> Result<DeclarationBody> {
    let path = file.map_or_else(|| PathBuf::from(DEFAULT_DECLARATION_FILE), Path::to_path_buf);

    let templater = FileTemplater;
    let content = templater.render(&path)?;
    DeclarationBody::parse(&content, Some(&path))
}
