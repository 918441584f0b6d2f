//! Video capture and encoding through `ffmpeg` subprocesses.
//!
//! Frames cross the pipes as tightly packed `bgr24`, the same layout
//! [`Frame`] stores, so no per-pixel conversion happens on this side.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;

use crate::{
    errors::{NeuralStyleError, Result},
    frame::Frame,
    traits::{FrameSink, FrameSource, StreamInfo},
};

/// Codec used for every output video.
pub const OUTPUT_CODEC: &str = "mpeg4";
const OUTPUT_TAG: &str = "mp4v";
const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Reads the first video stream's geometry, rate and frame count.
pub fn probe(path: &Path) -> Result<StreamInfo> {
    let open_error = |reason: String| NeuralStyleError::InputOpenFailed {
        path: path.to_path_buf(),
        reason,
    };

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,avg_frame_rate,nb_frames")
        .args(["-of", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| open_error(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(open_error(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe(&output.stdout).map_err(open_error)
}

fn parse_probe(json: &[u8]) -> std::result::Result<StreamInfo, String> {
    let parsed: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| format!("invalid ffprobe output: {e}"))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no frame size".to_string()),
    };

    let fps = [stream.avg_frame_rate, stream.r_frame_rate]
        .iter()
        .flatten()
        .find_map(|rate| parse_rational(rate))
        .unwrap_or_else(|| {
            tracing::warn!("stream reports no frame rate, assuming {DEFAULT_FPS}");
            DEFAULT_FPS
        });

    let frame_count = stream
        .nb_frames
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(StreamInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parses `num/den` or a plain number. Zero and non-finite rates yield `None`.
fn parse_rational(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Decodes a video file into BGR frames at its native size.
#[derive(Debug)]
pub struct FfmpegReader {
    path: PathBuf,
    info: StreamInfo,
    frame_bytes: usize,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegReader {
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe(path)?;

        let mut command = Command::new("ffmpeg");
        command
            .args(["-hide_banner", "-loglevel", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "bgr24", "-"]);
        Self::spawn(path, info, command)
    }

    /// Starts `command` as the decoder; its stdout must carry `bgr24` frames
    /// of the size in `info`.
    pub(crate) fn spawn(path: &Path, info: StreamInfo, mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| NeuralStyleError::InputOpenFailed {
                path: path.to_path_buf(),
                reason: format!("failed to spawn ffmpeg: {e}"),
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(NeuralStyleError::InputOpenFailed {
                path: path.to_path_buf(),
                reason: "failed to capture ffmpeg stdout".to_string(),
            });
        };

        tracing::debug!(path = %path.display(), ?info, "capture opened");
        Ok(Self {
            path: path.to_path_buf(),
            info,
            frame_bytes: info.width as usize * info.height as usize * 3,
            child: Some(child),
            stdout: Some(stdout),
        })
    }

    fn read_error(&self, reason: String) -> NeuralStyleError {
        NeuralStyleError::InputReadFailed {
            path: self.path.clone(),
            reason,
        }
    }

    /// Reaps the decoder after its output ended. A decoder that stopped on an
    /// error is a read failure, not the end of the video.
    fn finish(&mut self) -> Result<()> {
        self.stdout.take();
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| self.read_error(format!("failed to reap ffmpeg: {e}")))?;
        if !status.success() {
            return Err(self.read_error(format!("ffmpeg exited with {status}")));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegReader {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.frame_bytes];
        let mut filled = 0;
        while filled < buffer.len() {
            match stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(self.read_error(e.to_string())),
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < buffer.len() {
            return Err(self.read_error(format!(
                "truncated frame: got {filled} of {} bytes",
                buffer.len()
            )));
        }

        Frame::from_bgr_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or_else(|| self.read_error("frame buffer size mismatch".to_string()))
    }

    fn close(&mut self) -> Result<()> {
        self.stdout.take();
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        // Stop decoding whatever is left after an early exit.
        let _ = child.kill();
        child
            .wait()
            .map(|_| ())
            .map_err(|e| self.read_error(format!("failed to reap ffmpeg: {e}")))
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Encodes BGR frames into a video file with [`OUTPUT_CODEC`].
#[derive(Debug)]
pub struct FfmpegWriter {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegWriter {
    pub fn open(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let mut command = Command::new("ffmpeg");
        command
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "bgr24"])
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(format!("{fps}"))
            .args(["-i", "-", "-an", "-c:v", OUTPUT_CODEC, "-q:v", "2"]);
        if takes_mp4_tag(path) {
            command.args(["-tag:v", OUTPUT_TAG]);
        }
        command.arg(path);

        let writer = Self::spawn(path, width, height, command)?;
        tracing::debug!(path = %path.display(), width, height, fps, "writer opened");
        Ok(writer)
    }

    /// Starts `command` as the encoder; it reads `bgr24` frames on stdin.
    pub(crate) fn spawn(path: &Path, width: u32, height: u32, mut command: Command) -> Result<Self> {
        let write_error = |reason: String| NeuralStyleError::OutputWriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| write_error(format!("failed to spawn ffmpeg: {e}")))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(write_error("failed to capture ffmpeg stdin".to_string()));
        };

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
        })
    }
}

fn takes_mp4_tag(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "mp4" | "mov" | "m4v"))
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(NeuralStyleError::OutputWriteFailed {
                path: self.path.clone(),
                reason: format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            });
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| NeuralStyleError::OutputWriteFailed {
                path: self.path.clone(),
                reason: "writer already closed".to_string(),
            })?;
        stdin
            .write_all(frame.as_bytes())
            .map_err(|e| NeuralStyleError::OutputWriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn close(&mut self) -> Result<()> {
        // Closing stdin signals end of input so ffmpeg finalizes the container.
        self.stdin.take();
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| NeuralStyleError::OutputWriteFailed {
                path: self.path.clone(),
                reason: format!("failed to reap ffmpeg: {e}"),
            })?;
        if !status.success() {
            return Err(NeuralStyleError::OutputWriteFailed {
                path: self.path.clone(),
                reason: format!("ffmpeg exited with {status}"),
            });
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
