use std::path::PathBuf;

use clap::Parser;

use crate::style::Style;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Style model to apply
    #[arg(short, long, value_enum, default_value_t = Style::Mosaic)]
    pub style: Style,

    /// Image (.jpg .jpeg .png .bmp) or video (.mp4 .avi .mov .mkv) to stylize
    #[arg(short, long)]
    pub input: PathBuf,

    /// Destination file; the format follows its extension
    #[arg(short, long)]
    pub output: PathBuf,

    /// Show a live window while processing video (q to stop)
    #[arg(long)]
    pub preview: bool,

    /// Directory holding converted models, one `<style>.onnx` per style
    #[arg(long, default_value = "models")]
    pub cache_dir: PathBuf,

    /// Directory of exported `<style>.onnx` files to fill the cache from
    #[arg(long, conflicts_with = "model_repo")]
    pub model_dir: Option<PathBuf>,

    /// Hugging Face repository holding `<style>.onnx` files to fill the cache from
    #[arg(long)]
    pub model_repo: Option<String>,

    /// Substitute model used when the style model cannot be obtained.
    /// Its output does not match the requested style.
    #[arg(long)]
    pub fallback_model: Option<PathBuf>,

    /// GPU used by the TensorRT and CUDA execution providers
    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Intra-op threads for inference (runtime default when omitted)
    #[arg(short, long)]
    pub threads: Option<usize>,
}
