use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    errors::{NeuralStyleError, Result},
    ffmpeg::{FfmpegReader, FfmpegWriter},
    preview::WindowPreview,
    progress_tracker::ProgressTracker,
    stylizer::stylize,
    traits::{
        FrameSink, FrameSource, InferenceEngine, Preview, PreviewSignal, ProgressObserver,
        StreamInfo,
    },
};

/// Lifecycle of a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Opening,
    Streaming,
    Draining,
    Closed,
}

fn enter(state: JobState) {
    tracing::debug!(?state, "video job state");
}

/// What the frame loop did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    pub frames_written: u64,
    /// The preview asked to stop before end of stream.
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReport {
    pub output: PathBuf,
    pub frames_written: u64,
    pub cancelled: bool,
}

/// Stylizes every frame of `input` into `output`, optionally showing a live
/// preview window that can stop the job early.
#[tracing::instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn run<E: InferenceEngine + ?Sized>(
    engine: &E,
    input: &Path,
    output: &Path,
    preview: bool,
) -> Result<VideoReport> {
    enter(JobState::Opening);
    let mut source = FfmpegReader::open(input)?;
    let info = source.info();
    if info.frame_count == 0 {
        tracing::warn!("container reports no frame count, progress length unknown");
    }
    tracing::info!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        frames = info.frame_count,
        "input opened"
    );

    let mut window = preview.then(WindowPreview::new);
    let mut progress = ProgressTracker::new();
    let outcome = stream_to_output(
        engine,
        &mut source,
        output,
        |path, info| FfmpegWriter::open(path, info.width, info.height, info.fps),
        window.as_mut().map(|w| w as &mut dyn Preview),
        &mut progress,
    )?;

    tracing::info!(
        frames = outcome.frames_written,
        cancelled = outcome.cancelled,
        "video written"
    );
    Ok(VideoReport {
        output: output.to_path_buf(),
        frames_written: outcome.frames_written,
        cancelled: outcome.cancelled,
    })
}

/// Opens the output side for an already opened `source` and runs [`process`].
///
/// The output directory is created first and `open_sink` is called with the
/// output path and the source's stream info. If either fails, `source` is
/// closed before the error is returned.
pub fn stream_to_output<E, S, W, F>(
    engine: &E,
    source: &mut S,
    output: &Path,
    open_sink: F,
    preview: Option<&mut dyn Preview>,
    progress: &mut dyn ProgressObserver,
) -> Result<StreamOutcome>
where
    E: InferenceEngine + ?Sized,
    S: FrameSource + ?Sized,
    W: FrameSink,
    F: FnOnce(&Path, StreamInfo) -> Result<W>,
{
    let opened = prepare_output(output).and_then(|()| open_sink(output, source.info()));
    let mut sink = match opened {
        Ok(sink) => sink,
        Err(err) => {
            tracing::error!(error = %err, "output could not be opened");
            if let Err(close_err) = source.close() {
                tracing::warn!(error = %close_err, "failed to close input");
            }
            enter(JobState::Closed);
            return Err(err);
        }
    };

    process(engine, source, &mut sink, preview, progress)
}

fn prepare_output(output: &Path) -> Result<()> {
    match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| NeuralStyleError::OutputWriteFailed {
            path: output.to_path_buf(),
            reason: e.to_string(),
        }),
        None => Ok(()),
    }
}

/// Runs the frame loop over already opened streams and then releases them.
///
/// Source, sink, preview and progress are closed on every exit path: end of
/// stream, cancellation from the preview, or an error from any frame. When
/// both the loop and the cleanup fail, the loop's error is returned.
pub fn process<E, S, W>(
    engine: &E,
    source: &mut S,
    sink: &mut W,
    preview: Option<&mut dyn Preview>,
    progress: &mut dyn ProgressObserver,
) -> Result<StreamOutcome>
where
    E: InferenceEngine + ?Sized,
    S: FrameSource + ?Sized,
    W: FrameSink + ?Sized,
{
    let mut preview = preview;
    progress.start(source.info().frame_count);

    enter(JobState::Streaming);
    let streamed = stream(engine, source, sink, &mut preview, progress);
    if let Err(err) = &streamed {
        tracing::error!(error = %err, "frame loop aborted");
    }

    enter(JobState::Draining);
    let drained = drain(source, sink, preview, progress);
    enter(JobState::Closed);

    let outcome = streamed?;
    drained?;
    Ok(outcome)
}

fn stream<E, S, W, V, P>(
    engine: &E,
    source: &mut S,
    sink: &mut W,
    preview: &mut Option<&mut V>,
    progress: &mut P,
) -> Result<StreamOutcome>
where
    E: InferenceEngine + ?Sized,
    S: FrameSource + ?Sized,
    W: FrameSink + ?Sized,
    V: Preview + ?Sized,
    P: ProgressObserver + ?Sized,
{
    let mut outcome = StreamOutcome::default();

    while let Some(frame) = source.next_frame()? {
        let stylized = stylize(engine, &frame)?;
        sink.write_frame(&stylized)?;
        outcome.frames_written += 1;
        progress.advance();

        if let Some(preview) = preview.as_mut() {
            if preview.show(&stylized)? == PreviewSignal::Stop {
                tracing::info!(frames = outcome.frames_written, "stopped from preview");
                outcome.cancelled = true;
                break;
            }
        }
    }

    Ok(outcome)
}

fn drain<S, W, V, P>(
    source: &mut S,
    sink: &mut W,
    preview: Option<&mut V>,
    progress: &mut P,
) -> Result<()>
where
    S: FrameSource + ?Sized,
    W: FrameSink + ?Sized,
    V: Preview + ?Sized,
    P: ProgressObserver + ?Sized,
{
    let source_closed = source.close();
    let sink_closed = sink.close();
    if let Some(preview) = preview {
        preview.close();
    }
    progress.finish();
    source_closed.and(sink_closed)
}
