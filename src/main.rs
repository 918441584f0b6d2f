use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use neural_style_rs::{Config, JobOutcome, NeuralStyleError};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let config = Config::parse();

    match neural_style_rs::run(&config) {
        Ok(JobOutcome::Image { output }) => {
            println!("Stylized image saved to {}", output.display());
        }
        Ok(JobOutcome::Video(report)) => {
            let stopped = if report.cancelled { " (stopped early)" } else { "" };
            println!(
                "Stylized video saved to {} ({} frames){stopped}",
                report.output.display(),
                report.frames_written
            );
        }
        Err(NeuralStyleError::UnsupportedFormat { path }) => {
            eprintln!(
                "Unsupported file format: {}. Use .jpg/.jpeg/.png/.bmp images or .mp4/.avi/.mov/.mkv videos.",
                path.display()
            );
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err.into()),
    }

    Ok(ExitCode::SUCCESS)
}
