//! normalforge CLI - heightmap to normal map conversion
//!
//! This binary converts single heightmaps or whole texture trees into
//! tangent-space normal maps, reducing sources to 8-bit palette PNGs first
//! unless told otherwise.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use normalforge_cli::commands;
use normalforge_core::DEFAULT_STRENGTH;

/// normalforge - Heightmap to Normal Map Converter
#[derive(Parser)]
#[command(name = "normalforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every heightmap under a directory, skipping existing outputs
    Convert {
        /// Root directory of the texture tree
        root: String,

        /// Bump strength (positive)
        #[arg(short, long, default_value_t = DEFAULT_STRENGTH, value_parser = parse_strength)]
        strength: f64,

        /// Skip 8-bit reduction and write `<name>_normal_map.png` next to each source
        #[arg(long)]
        direct: bool,

        /// Seconds to wait for each ImageMagick call (0 = no limit)
        #[arg(long, default_value_t = normalforge_cli::reducer::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Output machine-readable JSON report (no colored output)
        #[arg(long)]
        json: bool,

        /// Also list skipped steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Convert a single heightmap
    Generate {
        /// Heightmap PNG
        input: String,

        /// Normal map PNG to write
        output: String,

        /// Bump strength (positive)
        #[arg(short, long, default_value_t = DEFAULT_STRENGTH, value_parser = parse_strength)]
        strength: f64,

        /// Replace the output if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Check that ImageMagick is available
    Doctor,
}

fn parse_strength(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|e| format!("`{}` is not a number: {}", s, e))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("strength must be a finite value > 0, got {}", s))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            root,
            strength,
            direct,
            timeout,
            json,
            verbose,
        } => commands::convert::run(&root, strength, direct, timeout, json, verbose),
        Commands::Generate {
            input,
            output,
            strength,
            force,
        } => commands::generate::run(&input, &output, strength, force),
        Commands::Doctor => commands::doctor::run(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
