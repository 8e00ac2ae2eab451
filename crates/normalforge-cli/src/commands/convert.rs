//! Convert command implementation
//!
//! Walks a texture tree and produces the reduced variants and normal maps
//! that are still missing. Per-file failures are reported but never change
//! the exit code.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::planner::{BatchPlanner, BatchReport, FileEvent, Pipeline, PlannerConfig};
use crate::reducer::{MagickReducer, ReducerConfig};

/// Run the convert command
///
/// # Arguments
/// * `root` - Root directory of the texture tree
/// * `strength` - Bump strength (finite, > 0)
/// * `direct` - Skip bit-depth reduction and convert raw heightmaps directly
/// * `timeout_secs` - Bound on each converter invocation (0 = unbounded)
/// * `json` - Print the batch report as JSON instead of colored text
/// * `verbose` - Print skipped steps too
///
/// # Returns
/// Exit code: 0 once the walk completes, whatever happened to single files
pub fn run(
    root: &str,
    strength: f64,
    direct: bool,
    timeout_secs: u64,
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let pipeline = if direct {
        Pipeline::Direct
    } else {
        Pipeline::Reduce
    };
    let config = PlannerConfig::default()
        .strength(strength)
        .pipeline(pipeline);
    let reducer = MagickReducer::with_config(ReducerConfig::default().timeout_secs(timeout_secs));
    let planner = BatchPlanner::new(reducer, config);

    if json {
        let report = planner.run(Path::new(root))?;
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "======================================".cyan());
    println!("{}", "  normalforge batch conversion".cyan());
    println!("{}", "======================================".cyan());
    println!();
    println!("{} {}", "Root directory:".blue().bold(), root);
    println!("{} {}", "Pipeline:".blue().bold(), pipeline.as_str());
    println!("{} {}", "Strength:".blue().bold(), strength);
    println!();

    let report = planner.run_with_observer(Path::new(root), &mut |event| {
        print_event(event, verbose)
    })?;

    print_summary(&report);

    Ok(ExitCode::SUCCESS)
}

fn print_event(event: &FileEvent, verbose: bool) {
    match event {
        FileEvent::Skipped { path, reason } => {
            if verbose {
                println!("  {} {} ({})", "SKIP".yellow(), path, reason.describe());
            }
        }
        FileEvent::Reduced { source, target } => {
            println!("  {} {} -> {}", "8BIT".green(), source, target);
        }
        FileEvent::Generated { source, target, .. } => {
            println!("  {} {} -> {}", "DONE".green(), source, target);
        }
        FileEvent::ReductionFailed {
            source,
            code,
            error,
        }
        | FileEvent::GenerationFailed {
            source,
            code,
            error,
        } => {
            println!(
                "  {} {} [{}] {}",
                "FAILED".red(),
                source,
                code.dimmed(),
                error
            );
        }
        FileEvent::WalkFailed { path, error } => {
            println!(
                "  {} {} {}",
                "FAILED".red(),
                path.as_deref().unwrap_or("<walk>"),
                error
            );
        }
    }
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("{}", "======================================".cyan());
    println!("{}", "  Conversion Summary".cyan());
    println!("{}", "======================================".cyan());
    println!();
    println!("{} {}", "Files seen:".blue().bold(), report.files_seen);
    println!("{} {}", "Ignored (not PNG):".blue().bold(), report.ignored);
    println!(
        "{} {} ({} failed)",
        "Reduced:".green().bold(),
        report.reductions_succeeded,
        report.reductions_failed
    );
    println!(
        "{} {} ({} failed)",
        "Normal maps:".green().bold(),
        report.generated,
        report.generation_failed
    );
    println!("{} {}", "Skipped:".yellow().bold(), report.skipped);
    println!(
        "{} {:.2}s",
        "Total runtime:".blue().bold(),
        report.runtime_seconds
    );

    if report.is_noop() {
        println!();
        println!("{} Nothing to do, all outputs exist", "INFO".blue().bold());
    }

    let failures = report.failures();
    if failures > 0 {
        println!();
        println!(
            "{} {} file(s) failed; see messages above",
            "WARN".yellow().bold(),
            failures
        );
    }
}
