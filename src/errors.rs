use std::path::PathBuf;
use thiserror::Error;

use crate::style::Style;

/// Structured error types for the style transfer pipeline.
///
/// Every failure is fatal to the current job. Variants carry the path or slot
/// involved so the binary can report them without parsing strings.
#[derive(Error, Debug)]
pub enum NeuralStyleError {
    /// Neither the primary model source nor the (opt-in) fallback produced
    /// an artifact. `fallback` is `None` when no fallback was configured.
    #[error("Model unavailable for style `{style}`: primary source failed ({primary}){}",
        .fallback.as_ref().map(|f| format!(", fallback failed ({f})")).unwrap_or_default())]
    ModelUnavailable {
        style: Style,
        primary: String,
        fallback: Option<String>,
    },

    #[error("Failed to write model artifact {path:?}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load model artifact {path:?}: {reason}")]
    ArtifactLoadFailed { path: PathBuf, reason: String },

    #[error("Failed to open input {path:?}: {reason}")]
    InputOpenFailed { path: PathBuf, reason: String },

    #[error("Failed to read input {path:?}: {reason}")]
    InputReadFailed { path: PathBuf, reason: String },

    #[error("Inference failed: {message}")]
    InferenceFailed { message: String },

    #[error("Failed to write output {path:?}: {reason}")]
    OutputWriteFailed { path: PathBuf, reason: String },

    #[error("Preview failed: {message}")]
    PreviewFailed { message: String },

    #[error("Unsupported input format: {path:?}")]
    UnsupportedFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, NeuralStyleError>;

impl NeuralStyleError {
    pub(crate) fn inference(message: impl Into<String>) -> Self {
        Self::InferenceFailed {
            message: message.into(),
        }
    }
}

/// Convert ONNX Runtime errors raised while running a session.
///
/// Session construction maps its errors to `ArtifactLoadFailed` explicitly,
/// so anything reaching this conversion comes from an inference call.
impl From<ort::Error> for NeuralStyleError {
    fn from(err: ort::Error) -> Self {
        Self::inference(err.to_string())
    }
}

/// Shape errors only occur while reshaping engine output.
impl From<ndarray::ShapeError> for NeuralStyleError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference(format!("unexpected output tensor shape: {err}"))
    }
}
