// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio command-line front end.
//
// Entry point. Initialises logging, loads configuration, and dispatches to
// the command implementations.

mod commands;
mod console;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use folio_core::config::DetectorKind;
use folio_core::error::Result;
use folio_core::human_errors::humanize_error;
use folio_core::ScanConfig;
use folio_vision::DewarpStage;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Find, flatten, and capture document pages", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used for missing fields)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured page detector
    #[arg(long, global = true, value_enum)]
    detector: Option<DetectorArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the page outline in an image and print it as JSON
    Detect {
        /// Input image
        #[arg(value_name = "IMAGE")]
        input: PathBuf,

        /// Also write the image with the detected outline drawn on it
        #[arg(long, value_name = "FILE")]
        overlay: Option<PathBuf>,
    },

    /// Detect the page and write the perspective-corrected page
    Extract {
        /// Input image
        #[arg(value_name = "IMAGE")]
        input: PathBuf,

        /// Output image
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Flatten curved text lines on a rectified page
    Dewarp {
        /// Rectified page image
        #[arg(value_name = "IMAGE")]
        input: PathBuf,

        /// Output image
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Render one diagnostic stage instead (threshold, dilated, closed,
        /// contours, spans, keypoints, curves, correspondence, output)
        #[arg(long)]
        stage: Option<DewarpStage>,
    },

    /// Run a live capture session over replayed frames
    Scan {
        /// Frames to replay, in order
        #[arg(value_name = "FRAME", required = true)]
        frames: Vec<PathBuf>,

        /// Output image for the captured page
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Delay between replayed frames
        #[arg(long, default_value = "100")]
        interval_ms: u64,

        /// Give up if no page has been captured after this long
        #[arg(long, default_value = "30000")]
        max_wait_ms: u64,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DetectorArg {
    /// Edge contours simplified to quadrilaterals
    Contour,
    /// Extreme Hough lines intersected into corners
    Hough,
}

impl From<DetectorArg> for DetectorKind {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::Contour => DetectorKind::Contour,
            DetectorArg::Hough => DetectorKind::Hough,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "folio failed");
            let human = humanize_error(&e);
            eprintln!("Error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>, detector: Option<DetectorArg>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(kind) = detector {
        config.detector.kind = kind.into();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.detector)?;
    tracing::info!(detector = ?config.detector.kind, "Folio starting");

    match cli.command {
        Commands::Detect { input, overlay } => print_json(&commands::detect(&config, &input, overlay.as_deref())?),
        Commands::Extract { input, output } => print_json(&commands::extract(&config, &input, &output)?),
        Commands::Dewarp { input, output, stage } => {
            print_json(&commands::dewarp(&config, &input, &output, stage)?)
        }
        Commands::Scan {
            frames,
            output,
            interval_ms,
            max_wait_ms,
        } => print_json(&commands::scan(
            &config,
            &frames,
            &output,
            Duration::from_millis(interval_ms),
            Duration::from_millis(max_wait_ms),
        )?),
        Commands::Config => {
            println!("{}", commands::default_config()?);
            Ok(())
        }
    }
}
