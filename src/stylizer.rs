use crate::{
    codec::{decode, encode},
    errors::Result,
    frame::Frame,
    traits::InferenceEngine,
};

/// Runs one frame through encode, inference and decode.
///
/// The result always has the dimensions of `frame`. Engine errors are returned
/// as-is; nothing is retried.
pub fn stylize<E: InferenceEngine + ?Sized>(engine: &E, frame: &Frame) -> Result<Frame> {
    let input = encode(frame);
    let output = engine.infer(input.view())?;
    decode(output.view(), frame.width(), frame.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NeuralStyleError;
    use crate::mocks::{FailingEngine, IdentityEngine, InvertEngine};

    #[test]
    fn test_output_matches_input_dimensions() {
        let engine = IdentityEngine::default();
        for (w, h) in [(1, 1), (641, 479), (1280, 720)] {
            let frame = Frame::filled(w, h, [12, 200, 90]);
            let out = stylize(&engine, &frame).unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
        assert_eq!(engine.calls(), 3);
    }

    #[test]
    fn test_repeated_calls_on_same_engine() {
        let engine = InvertEngine;
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        let first = stylize(&engine, &frame).unwrap();
        let second = stylize(&engine, &frame).unwrap();
        assert_eq!(first, second);
        assert!(first.as_bytes().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_engine_error_propagates() {
        let engine = FailingEngine::after(0);
        let frame = Frame::filled(4, 4, [1, 1, 1]);
        assert!(matches!(
            stylize(&engine, &frame),
            Err(NeuralStyleError::InferenceFailed { .. })
        ));
    }
}
