use minifb::{Key, Window, WindowOptions};

use crate::{
    errors::{NeuralStyleError, Result},
    frame::Frame,
    traits::{Preview, PreviewSignal},
};

const TITLE: &str = "neural-style preview - q to stop";

/// Live window showing each processed frame. Pressing `q` or `Esc`, or
/// closing the window, asks the job to stop.
///
/// The window is created lazily on the first frame, so its size always
/// matches the frames being shown.
#[derive(Default)]
pub struct WindowPreview {
    window: Option<Window>,
}

impl WindowPreview {
    pub fn new() -> Self {
        Self::default()
    }

    fn window_for(&mut self, width: usize, height: usize) -> Result<&mut Window> {
        let reuse = self
            .window
            .as_ref()
            .is_some_and(|w| w.get_size() == (width, height));
        if !reuse {
            let window = Window::new(TITLE, width, height, WindowOptions::default())
                .map_err(|e| NeuralStyleError::PreviewFailed {
                    message: e.to_string(),
                })?;
            self.window = Some(window);
        }
        self.window
            .as_mut()
            .ok_or_else(|| NeuralStyleError::PreviewFailed {
                message: "preview window unavailable".to_string(),
            })
    }
}

impl Preview for WindowPreview {
    fn show(&mut self, frame: &Frame) -> Result<PreviewSignal> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        let buffer = frame.to_xrgb();

        let window = self.window_for(width, height)?;
        window
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| NeuralStyleError::PreviewFailed {
                message: e.to_string(),
            })?;

        let stop = !window.is_open()
            || window.is_key_down(Key::Q)
            || window.is_key_down(Key::Escape);

        Ok(if stop {
            PreviewSignal::Stop
        } else {
            PreviewSignal::Continue
        })
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            tracing::debug!("preview window closed");
        }
    }
}
