//! In-memory input images.
//!
//! `ImageFrame` holds an RGB pixel buffer exactly as it was captured together
//! with the orientation metadata that says how it should be displayed.
//! Detections are always reported in the *displayed* (oriented) coordinate
//! space, so [`ImageFrame::size`] swaps the axes for rotated orientations.

use std::path::Path;

use image::{imageops, DynamicImage, RgbImage};

use crate::error::ImageProcessingError;
use crate::geometry::Size;

/// EXIF-style orientation of the stored pixel buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

impl Orientation {
    /// Map an EXIF orientation tag (1-8). Unknown values fall back to `Up`.
    pub fn from_exif(tag: u8) -> Self {
        match tag {
            2 => Orientation::UpMirrored,
            3 => Orientation::Down,
            4 => Orientation::DownMirrored,
            5 => Orientation::LeftMirrored,
            6 => Orientation::Right,
            7 => Orientation::RightMirrored,
            8 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            Orientation::UpMirrored
                | Orientation::DownMirrored
                | Orientation::LeftMirrored
                | Orientation::RightMirrored
        )
    }

    /// True when displaying the buffer swaps width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            Orientation::Left
                | Orientation::Right
                | Orientation::LeftMirrored
                | Orientation::RightMirrored
        )
    }
}

#[derive(Clone, Debug)]
pub struct ImageFrame {
    pixels: RgbImage,
    orientation: Orientation,
}

impl ImageFrame {
    pub fn new(pixels: RgbImage) -> Result<Self, ImageProcessingError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageProcessingError::ZeroDimensions);
        }
        Ok(Self {
            pixels,
            orientation: Orientation::Up,
        })
    }

    /// Wrap tightly packed RGB24 bytes.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageProcessingError> {
        let pixels =
            RgbImage::from_raw(width, height, data).ok_or(ImageProcessingError::ConversionFailed)?;
        Self::new(pixels)
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageProcessingError> {
        Self::new(image.into_rgb8())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ImageProcessingError> {
        Self::from_dynamic(image::load_from_memory(bytes)?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageProcessingError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Size of the stored buffer, ignoring orientation.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Size of the image as displayed.
    pub fn size(&self) -> Size {
        let (w, h) = self.pixels.dimensions();
        if self.orientation.swaps_axes() {
            Size::new(h as f64, w as f64)
        } else {
            Size::new(w as f64, h as f64)
        }
    }

    /// Pixel buffer with the orientation applied, so row 0 is the top of the
    /// displayed image.
    pub fn upright(&self) -> RgbImage {
        let px = &self.pixels;
        match self.orientation {
            Orientation::Up => px.clone(),
            Orientation::Down => imageops::rotate180(px),
            Orientation::Left => imageops::rotate270(px),
            Orientation::Right => imageops::rotate90(px),
            Orientation::UpMirrored => imageops::flip_horizontal(px),
            Orientation::DownMirrored => imageops::flip_vertical(px),
            Orientation::LeftMirrored => imageops::flip_horizontal(&imageops::rotate90(px)),
            Orientation::RightMirrored => imageops::flip_horizontal(&imageops::rotate270(px)),
        }
    }

    pub(crate) fn with_pixels(&self, pixels: RgbImage) -> Self {
        Self {
            pixels,
            orientation: self.orientation,
        }
    }
}
