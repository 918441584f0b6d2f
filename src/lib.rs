pub mod codec;
pub mod config;
pub mod errors;
pub mod ffmpeg;
pub mod frame;
pub mod image_job;
pub mod model;
pub mod preview;
pub mod progress_tracker;
pub mod provisioner;
pub mod style;
pub mod stylizer;
pub mod traits;
pub mod video_job;

pub mod mocks;

use std::path::{Path, PathBuf};

pub use config::Config;
pub use errors::{NeuralStyleError, Result};
pub use frame::Frame;
pub use model::{OnnxSession, SessionOptions};
pub use provisioner::Provisioner;
pub use style::Style;
pub use stylizer::stylize;
pub use traits::*;
pub use video_job::VideoReport;

use provisioner::{FallbackModel, HubSource, LocalDirSource, Unconfigured};

/// Which job an input path is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies by extension, case-insensitively. `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" | "png" | "bmp" => Some(Self::Image),
            "mp4" | "avi" | "mov" | "mkv" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Image { output: PathBuf },
    Video(VideoReport),
}

/// Builds the provisioner described by the command line.
pub fn provisioner_from_config(config: &Config) -> Provisioner {
    let primary: Box<dyn ModelSource> = match (&config.model_dir, &config.model_repo) {
        (Some(dir), _) => Box::new(LocalDirSource::new(dir)),
        (None, Some(repo)) => Box::new(HubSource::new(repo)),
        (None, None) => Box::new(Unconfigured),
    };
    let provisioner = Provisioner::new(&config.cache_dir, primary);
    match &config.fallback_model {
        Some(path) => provisioner.with_fallback(Box::new(FallbackModel::new(path))),
        None => provisioner,
    }
}

/// Routes the input to the image or video job.
///
/// The input kind is checked before anything else, so an unsupported input
/// never touches the model cache.
pub fn run(config: &Config) -> Result<JobOutcome> {
    let kind = MediaKind::from_path(&config.input).ok_or_else(|| {
        NeuralStyleError::UnsupportedFormat {
            path: config.input.clone(),
        }
    })?;

    let provisioner = provisioner_from_config(config);
    let session = provisioner.ensure_ready(
        config.style,
        SessionOptions {
            device_id: config.device_id,
            threads: config.threads,
        },
    )?;

    match kind {
        MediaKind::Image => {
            if config.preview {
                tracing::debug!("preview is ignored for images");
            }
            image_job::run(&session, &config.input, &config.output)?;
            Ok(JobOutcome::Image {
                output: config.output.clone(),
            })
        }
        MediaKind::Video => {
            video_job::run(&session, &config.input, &config.output, config.preview)
                .map(JobOutcome::Video)
        }
    }
}
