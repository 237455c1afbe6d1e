//! Command-line front end for the timetable extraction pipeline.
//!
//! Reads a timetable image and a course-code CSV, runs the pipeline,
//! and writes the week schedule as JSON to stdout or a file.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use timegrid::{detect, extract_schedule, CourseTable, PipelineConfig, TesseractEngine};

#[derive(Parser, Debug)]
#[command(
    name = "timegrid",
    about = "Extract a weekly schedule from a timetable grid image"
)]
struct Args {
    /// Path to the timetable image file
    #[arg(short, long)]
    image: PathBuf,

    /// Path to the CSV file containing course codes and names
    #[arg(short, long)]
    csv: PathBuf,

    /// Pipeline configuration file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the schedule JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Save the binarized highlight mask to this path for inspection
    #[arg(long)]
    debug_mask: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !args.image.exists() {
        return Err(anyhow!("image file not found at {}", args.image.display()));
    }
    if !args.csv.exists() {
        return Err(anyhow!("CSV file not found at {}", args.csv.display()));
    }

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path),
        None => PipelineConfig::default(),
    };

    let courses = CourseTable::from_csv(&args.csv).context("failed to read course table")?;
    info!(courses = courses.len(), "loaded course mappings");

    let img = image::open(&args.image)
        .with_context(|| format!("could not load image at {}", args.image.display()))?
        .to_rgba8();

    if let Some(path) = &args.debug_mask {
        let mask = detect::build_highlight_mask(&img, &config.detection);
        mask.save(path)
            .with_context(|| format!("failed to save highlight mask to {}", path.display()))?;
        info!(path = %path.display(), "saved highlight mask");
    }

    let engine = TesseractEngine::new()?;
    let schedule = extract_schedule(&img, &courses, &engine, &config)?;
    info!(periods = schedule.period_count(), "extraction complete");

    let json = if args.pretty {
        serde_json::to_string_pretty(&schedule)?
    } else {
        serde_json::to_string(&schedule)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "schedule written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
