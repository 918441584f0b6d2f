use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{NeuralStyleError, Result};
use crate::frame::Frame;

pub const INPUT_HEIGHT: u32 = 480;
pub const INPUT_WIDTH: u32 = 640;

/// Shape of the tensor fed to every exported style graph.
pub const INPUT_SHAPE: [usize; 4] = [1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize];

const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Converts a BGR frame of any size to a `1x3x480x640` RGB tensor in `[0, 1]`.
pub fn encode(frame: &Frame) -> Array4<f32> {
    let resized = imageops::resize(frame.buffer(), INPUT_WIDTH, INPUT_HEIGHT, RESIZE_FILTER);

    // CHW view; reversing the channel axis turns BGR into RGB.
    resized
        .as_ndarray3()
        .slice_move(s![NewAxis, ..;-1, .., ..])
        .mapv(|v| f32::from(v) / 255.0)
}

/// Converts an NCHW RGB tensor back to a BGR frame of the requested size.
///
/// Values are scaled by 255 and clamped, so any finite engine output maps to
/// a valid pixel.
pub fn decode(tensor: ArrayView4<f32>, target_width: u32, target_height: u32) -> Result<Frame> {
    let (batch, channels, height, width) = tensor.dim();
    if batch != 1 || channels != 3 {
        return Err(NeuralStyleError::inference(format!(
            "expected output shape (1, 3, H, W), got {:?}",
            tensor.shape()
        )));
    }

    let bgr = tensor
        .index_axis_move(Axis(0), 0)
        .permuted_axes([1, 2, 0])
        .slice_move(s![.., .., ..;-1]);
    let data: Vec<u8> = bgr
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    let image = RgbImage::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| NeuralStyleError::inference("output tensor does not fit an image buffer"))?;

    let image = if image.dimensions() == (target_width, target_height) {
        image
    } else {
        imageops::resize(&image, target_width, target_height, RESIZE_FILTER)
    };
    Ok(Frame::from_bgr_buffer(image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape_and_range_for_any_size() {
        for (w, h) in [(1, 1), (37, 91), (640, 480), (1920, 1080)] {
            let frame = Frame::filled(w, h, [255, 128, 0]);
            let tensor = encode(&frame);
            assert_eq!(tensor.shape(), &INPUT_SHAPE);
            assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_encode_is_rgb_channel_first() {
        // blue=255, green=128, red=0
        let frame = Frame::filled(8, 8, [255, 128, 0]);
        let tensor = encode(&frame);
        assert_eq!(tensor[[0, 0, 10, 10]], 0.0);
        assert!((tensor[[0, 1, 10, 10]] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 2, 10, 10]], 1.0);
    }

    #[test]
    fn test_decode_restores_target_size() {
        let tensor = Array4::<f32>::from_elem((1, 3, 480, 640), 0.5);
        let frame = decode(tensor.view(), 123, 45).unwrap();
        assert_eq!(frame.dimensions(), (123, 45));
        assert_eq!(frame.as_bytes().len(), 123 * 45 * 3);
    }

    #[test]
    fn test_decode_clamps_out_of_range_values() {
        let mut tensor = Array4::<f32>::zeros((1, 3, 4, 4));
        tensor.slice_mut(s![.., 0, .., ..]).fill(7.0);
        tensor.slice_mut(s![.., 1, .., ..]).fill(-3.0);
        tensor.slice_mut(s![.., 2, .., ..]).fill(f32::NAN);
        let frame = decode(tensor.view(), 4, 4).unwrap();
        // red channel lands last in BGR order
        assert_eq!(&frame.as_bytes()[..3], &[0, 0, 255]);
    }

    #[test]
    fn test_decode_converts_rgb_to_bgr() {
        let mut tensor = Array4::<f32>::zeros((1, 3, 2, 2));
        tensor.slice_mut(s![.., 0, .., ..]).fill(1.0);
        let frame = decode(tensor.view(), 2, 2).unwrap();
        assert_eq!(frame.to_rgb_image().get_pixel(1, 1).0, [255, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_wrong_channel_count() {
        let tensor = Array4::<f32>::zeros((1, 1, 480, 640));
        assert!(matches!(
            decode(tensor.view(), 10, 10),
            Err(NeuralStyleError::InferenceFailed { .. })
        ));
    }

    #[test]
    fn test_pipeline_shape_with_identity_engine() {
        let frame = Frame::filled(300, 200, [1, 2, 3]);
        let out = decode(encode(&frame).view(), frame.width(), frame.height()).unwrap();
        assert_eq!(out.dimensions(), frame.dimensions());
    }
}
