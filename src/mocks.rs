use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::prelude::*;

use crate::errors::{NeuralStyleError, Result};
use crate::frame::Frame;
use crate::style::Style;
use crate::traits::{
    FrameSink, FrameSource, InferenceEngine, ModelSource, Preview, PreviewSignal,
    ProgressObserver, StreamInfo,
};

/// Engine that returns its input unchanged.
#[derive(Debug, Default)]
pub struct IdentityEngine {
    calls: AtomicUsize,
}

impl IdentityEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for IdentityEngine {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(input.to_owned())
    }
}

/// Engine that maps every value `v` to `1 - v`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvertEngine;

impl InferenceEngine for InvertEngine {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        Ok(input.mapv(|v| 1.0 - v))
    }
}

/// Engine that succeeds for a fixed number of calls and then fails.
#[derive(Debug)]
pub struct FailingEngine {
    succeed: usize,
    calls: AtomicUsize,
}

impl FailingEngine {
    pub const fn after(succeed: usize) -> Self {
        Self {
            succeed,
            calls: AtomicUsize::new(0),
        }
    }
}

impl InferenceEngine for FailingEngine {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.succeed {
            return Err(NeuralStyleError::inference(format!(
                "simulated engine failure on call {}",
                call + 1
            )));
        }
        Ok(input.to_owned())
    }
}

/// Model source backed by a fixed file that counts how often it is asked.
#[derive(Debug, Clone)]
pub struct CountingSource {
    path: PathBuf,
    fetches: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the fetch counter, usable after the source is boxed.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl ModelSource for CountingSource {
    fn describe(&self) -> String {
        format!("counting:{}", self.path.display())
    }

    fn fetch(&self, _style: Style) -> anyhow::Result<PathBuf> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(self.path.is_file(), "{} does not exist", self.path.display());
        Ok(self.path.clone())
    }
}

/// In-memory capture yielding `count` solid frames.
#[derive(Debug)]
pub struct MemorySource {
    info: StreamInfo,
    remaining: u64,
    pub frames_read: u64,
    pub closed: bool,
    pub close_calls: usize,
}

impl MemorySource {
    pub fn new(width: u32, height: u32, count: u64) -> Self {
        Self {
            info: StreamInfo {
                width,
                height,
                fps: 25.0,
                frame_count: count,
            },
            remaining: count,
            frames_read: 0,
            closed: false,
            close_calls: 0,
        }
    }

    /// Reports a frame count different from what is actually delivered.
    pub fn with_reported_count(mut self, frame_count: u64) -> Self {
        self.info.frame_count = frame_count;
        self
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed || self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.frames_read += 1;
        let shade = (self.frames_read % 256) as u8;
        Ok(Some(Frame::filled(
            self.info.width,
            self.info.height,
            [shade, shade, shade],
        )))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.close_calls += 1;
        Ok(())
    }
}

/// Sink that keeps every written frame.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<Frame>,
    pub closed: bool,
    /// Fail the write of this (1-based) frame.
    pub fail_on: Option<usize>,
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.closed {
            return Err(NeuralStyleError::OutputWriteFailed {
                path: PathBuf::from("memory"),
                reason: "sink already closed".to_string(),
            });
        }
        if self.fail_on == Some(self.frames.len() + 1) {
            return Err(NeuralStyleError::OutputWriteFailed {
                path: PathBuf::from("memory"),
                reason: "simulated write failure".to_string(),
            });
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Preview that requests a stop after a fixed number of shown frames.
#[derive(Debug, Default)]
pub struct ScriptedPreview {
    stop_after: Option<usize>,
    pub shown: usize,
    pub closed: bool,
}

impl ScriptedPreview {
    pub const fn stop_after(frames: usize) -> Self {
        Self {
            stop_after: Some(frames),
            shown: 0,
            closed: false,
        }
    }

    pub const fn never_stop() -> Self {
        Self {
            stop_after: None,
            shown: 0,
            closed: false,
        }
    }
}

impl Preview for ScriptedPreview {
    fn show(&mut self, _frame: &Frame) -> Result<PreviewSignal> {
        self.shown += 1;
        match self.stop_after {
            Some(limit) if self.shown >= limit => Ok(PreviewSignal::Stop),
            _ => Ok(PreviewSignal::Continue),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Observer that records the events it receives.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub total: Option<u64>,
    pub advanced: u64,
    pub finished: bool,
}

impl ProgressObserver for RecordingProgress {
    fn start(&mut self, total: u64) {
        self.total = Some(total);
    }

    fn advance(&mut self) {
        self.advanced += 1;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_engine_counts_calls() {
        let engine = FailingEngine::after(2);
        let input = Array4::<f32>::zeros((1, 3, 2, 2));
        assert!(engine.infer(input.view()).is_ok());
        assert!(engine.infer(input.view()).is_ok());
        assert!(engine.infer(input.view()).is_err());
    }

    #[test]
    fn test_memory_source_stops_after_close() -> Result<()> {
        let mut source = MemorySource::new(4, 4, 10);
        assert!(source.next_frame()?.is_some());
        source.close()?;
        assert!(source.next_frame()?.is_none());
        Ok(())
    }
}
