//! Doctor command implementation
//!
//! Checks that the external converter can be found.

use anyhow::Result;
use colored::Colorize;
use std::process::{Command, ExitCode, Stdio};

use crate::reducer::{MagickReducer, TOOL_PATH_ENV};

/// Run the doctor command
///
/// # Returns
/// Exit code: 0 always; a missing converter only limits `convert` to `--direct`
pub fn run() -> Result<ExitCode> {
    println!("{}", "normalforge doctor".cyan().bold());
    println!("{}", "==================".cyan());
    println!();

    println!("{}", "Versions:".bold());
    println!(
        "  {} normalforge-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("{}", "Dependencies:".bold());
    match MagickReducer::new().find_tool() {
        Ok(path) => {
            let version = tool_version(&path).unwrap_or_else(|| "unknown version".to_string());
            println!(
                "  {} ImageMagick {} ({})",
                "ok".green(),
                version,
                path.display()
            );
        }
        Err(_) => {
            println!("  {} ImageMagick not found", "!!".yellow());
            println!(
                "     {}",
                "It is required for 8-bit reduction; `convert --direct` works without it.".dimmed()
            );
            println!(
                "     {}",
                format!("Install it or point {} at the executable.", TOOL_PATH_ENV).dimmed()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// First line of `<tool> -version`, trimmed to the version token.
fn tool_version(path: &std::path::Path) -> Option<String> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version_line(stdout.lines().next()?)
}

fn parse_version_line(line: &str) -> Option<String> {
    // "Version: ImageMagick 7.1.1-15 Q16-HDRI x86_64 ..."
    line.split_whitespace()
        .skip_while(|w| *w != "ImageMagick")
        .nth(1)
        .map(str::to_string)
}
