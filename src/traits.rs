use std::path::PathBuf;

use ndarray::prelude::*;

use crate::errors::Result;
use crate::frame::Frame;
use crate::style::Style;

/// Maps an input tensor to an output tensor. Implemented by the ONNX session
/// and by test doubles.
pub trait InferenceEngine {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &E {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        (**self).infer(input)
    }
}

/// Somewhere a pre-exported graph for a style can be obtained from.
pub trait ModelSource {
    /// Short label used in logs and error messages.
    fn describe(&self) -> String;

    /// Returns the path of a graph file for `style`. The provisioner copies it
    /// into its own cache, so the file may live anywhere.
    fn fetch(&self, style: Style) -> anyhow::Result<PathBuf>;
}

/// Stream parameters read when a capture is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count. Approximate and possibly zero; only
    /// used for progress display.
    pub frame_count: u64,
}

/// Sequential frame reader.
pub trait FrameSource {
    fn info(&self) -> StreamInfo;

    /// `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Releases the underlying stream. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

/// Sequential frame writer.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes and releases the output. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSignal {
    Continue,
    /// The user asked to stop early.
    Stop,
}

/// Live display of processed frames; also the cancellation channel.
pub trait Preview {
    fn show(&mut self, frame: &Frame) -> Result<PreviewSignal>;
    fn close(&mut self);
}

/// Receives progress events from a job.
pub trait ProgressObserver {
    /// `total` is zero when the length is unknown.
    fn start(&mut self, total: u64);
    fn advance(&mut self);
    fn finish(&mut self);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn start(&mut self, _total: u64) {}
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}
