use image::imageops::{self, FilterType};

use crate::error::ImageProcessingError;
use crate::frame::ImageFrame;
use crate::geometry::{ScaleTransform, Size};

/// Longest side, in pixels, an image may have before it is downscaled.
pub const DEFAULT_MAX_SIDE_LENGTH: u32 = 4000;

/// An image ready for inference plus the transform that produced it.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub frame: ImageFrame,
    pub transform: ScaleTransform,
}

/// Bounds the cost of inference on very large captures while keeping the
/// aspect ratio.
#[derive(Clone, Copy, Debug)]
pub struct Preprocessor {
    max_side_length: u32,
}

impl Preprocessor {
    pub fn new(max_side_length: u32) -> Self {
        Self { max_side_length }
    }

    pub fn max_side_length(&self) -> u32 {
        self.max_side_length
    }

    pub fn set_max_side_length(&mut self, max_side_length: u32) {
        self.max_side_length = max_side_length;
    }

    pub fn prepare(&self, frame: &ImageFrame) -> Result<PreparedImage, ImageProcessingError> {
        let (width, height) = frame.pixel_size();
        if width == 0 || height == 0 {
            return Err(ImageProcessingError::ZeroDimensions);
        }
        if self.max_side_length == 0 {
            return Err(ImageProcessingError::ZeroMaxSideLength);
        }
        let longer_side = Size::new(width as f64, height as f64).longer_side();
        let max_side = self.max_side_length as f64;
        if longer_side <= max_side {
            return Ok(PreparedImage {
                frame: frame.clone(),
                transform: ScaleTransform::identity(),
            });
        }

        let scale = max_side / longer_side;
        let scaled_width = scaled_dimension(width, scale);
        let scaled_height = scaled_dimension(height, scale);
        let pixels = imageops::resize(
            frame.pixels(),
            scaled_width,
            scaled_height,
            FilterType::Triangle,
        );
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageProcessingError::ConversionFailed);
        }
        log::debug!(
            "downscaled {}x{} to {}x{} (scale {:.4})",
            width,
            height,
            scaled_width,
            scaled_height,
            scale
        );
        Ok(PreparedImage {
            frame: frame.with_pixels(pixels),
            transform: ScaleTransform::uniform(scale),
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIDE_LENGTH)
    }
}

fn scaled_dimension(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}
