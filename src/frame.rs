use image::{ImageBuffer, Rgb, RgbImage};

/// One decoded 8-bit, 3-channel picture in BGR channel order.
///
/// The pixels live in an `ImageBuffer<Rgb<u8>>` used as a plain
/// three-channel container, so `imageops` can resize it directly; the
/// channel at index 0 is blue, not red.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: ImageBuffer<Rgb<u8>, Vec<u8>>,
}

impl Frame {
    /// Wraps tightly packed `bgr24` bytes. Returns `None` when `data` does not
    /// hold exactly `width * height * 3` bytes.
    pub fn from_bgr_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub(crate) fn from_bgr_buffer(buffer: ImageBuffer<Rgb<u8>, Vec<u8>>) -> Self {
        Self { buffer }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let mut buffer = image.clone();
        swap_red_blue(&mut buffer);
        Self { buffer }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let mut image = self.buffer.clone();
        swap_red_blue(&mut image);
        image
    }

    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        Self {
            buffer: ImageBuffer::from_pixel(width, height, Rgb(bgr)),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Packed `bgr24` bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub(crate) fn buffer(&self) -> &ImageBuffer<Rgb<u8>, Vec<u8>> {
        &self.buffer
    }

    /// `0RGB` words for window surfaces.
    pub fn to_xrgb(&self) -> Vec<u32> {
        self.buffer
            .pixels()
            .map(|Rgb([b, g, r])| (u32::from(*r) << 16) | (u32::from(*g) << 8) | u32::from(*b))
            .collect()
    }
}

fn swap_red_blue(buffer: &mut RgbImage) {
    for pixel in buffer.pixels_mut() {
        pixel.0.swap(0, 2);
    }
}
