use std::fs;
use std::path::Path;

use image::ImageFormat;

use crate::{
    errors::{NeuralStyleError, Result},
    frame::Frame,
    stylizer::stylize,
    traits::InferenceEngine,
};

/// Stylizes a single image file. The output format follows the extension of
/// `output`.
#[tracing::instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn run<E: InferenceEngine + ?Sized>(engine: &E, input: &Path, output: &Path) -> Result<()> {
    let format = output_format(output)?;

    let image = image::open(input)
        .map_err(|e| NeuralStyleError::InputReadFailed {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })?
        .into_rgb8();
    let frame = Frame::from_rgb_image(&image);

    let stylized = stylize(engine, &frame)?;

    let write_error = |reason: String| NeuralStyleError::OutputWriteFailed {
        path: output.to_path_buf(),
        reason,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
    }
    stylized
        .to_rgb_image()
        .save_with_format(output, format)
        .map_err(|e| write_error(e.to_string()))?;

    tracing::info!("image written");
    Ok(())
}

fn output_format(output: &Path) -> Result<ImageFormat> {
    ImageFormat::from_path(output)
        .ok()
        .filter(|f| f.writing_enabled())
        .ok_or_else(|| NeuralStyleError::OutputWriteFailed {
            path: output.to_path_buf(),
            reason: "extension does not name a writable image format".to_string(),
        })
}
