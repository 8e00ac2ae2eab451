//! Generate command implementation
//!
//! Converts a single heightmap into a normal map.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use normalforge_core::generate_normal_map;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use crate::publish::{self, PublishError};

/// Run the generate command
///
/// # Arguments
/// * `input` - Heightmap PNG
/// * `output` - Normal map PNG to write
/// * `strength` - Bump strength (finite, > 0)
/// * `force` - Replace `output` if it already exists
pub fn run(input: &str, output: &str, strength: f64, force: bool) -> Result<ExitCode> {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    if output_path.exists() && !force {
        bail!(
            "Output already exists: {} (use --force to replace it)",
            output
        );
    }

    let bytes =
        fs::read(input_path).with_context(|| format!("Failed to read heightmap: {}", input))?;
    let result = generate_normal_map(&bytes, strength)
        .with_context(|| format!("Failed to generate normal map from: {}", input))?;

    match publish::publish_bytes(output_path, &result.data, force) {
        Ok(()) => {}
        Err(PublishError::AlreadyExists { path }) => {
            bail!("Output appeared while generating: {}", path.display())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to write: {}", output)),
    }

    println!(
        "{} {} -> {} ({}x{})",
        "DONE".green().bold(),
        input,
        output,
        result.width,
        result.height
    );
    println!("  {} {}", "blake3:".dimmed(), result.hash.dimmed());

    Ok(ExitCode::SUCCESS)
}
