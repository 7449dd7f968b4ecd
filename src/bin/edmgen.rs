//! edmgen - render a JSON song description to a WAV file.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use edmgen_core::{parse_config, render, validate};

#[derive(Parser)]
#[command(name = "edmgen")]
#[command(about = "Render an EDM song description to a WAV file")]
#[command(version)]
struct Cli {
    /// Song description (JSON)
    input: PathBuf,

    /// Output WAV file
    output: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let song = parse_config(&text).with_context(|| format!("failed to parse {}", cli.input.display()))?;

    let report = validate(&song);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.is_ok() {
        for error in &report.errors {
            eprintln!("error: {error}");
        }
        bail!("{} validation error(s) in {}", report.errors.len(), cli.input.display());
    }

    info!(input = %cli.input.display(), sections = song.sections.len(), "rendering");
    let audio = render(&song).context("render failed")?;
    audio
        .write_wav(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    println!(
        "Wrote {} ({:.2}s, {} Hz mono)",
        cli.output.display(),
        audio.duration(),
        audio.sample_rate
    );
    Ok(())
}
