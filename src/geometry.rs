//! Plain geometry values shared by the detection pipeline.
//!
//! Rectangles are stored as origin + size in `f64`. Pixel-space rectangles use
//! a top-left origin; normalized rectangles produced by inference backends use
//! a bottom-left origin (see [`crate::detect::Observation`]).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn longer_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    /// Same rectangle with non-negative width and height.
    pub fn standardized(&self) -> Rect {
        Rect::new(
            self.x.min(self.x + self.width),
            self.y.min(self.y + self.height),
            self.width.abs(),
            self.height.abs(),
        )
    }

    /// Half-open containment: points on the max edges are outside. Negative
    /// extents are standardized first.
    pub fn contains(&self, point: Point) -> bool {
        let rect = self.standardized();
        point.x >= rect.min_x()
            && point.x < rect.max_x()
            && point.y >= rect.min_y()
            && point.y < rect.max_y()
    }

    /// Mirror across the vertical midline of a frame of the given size.
    pub fn mirrored_horizontally(&self, frame: Size) -> Rect {
        Rect::new(frame.width - self.x - self.width, self.y, self.width, self.height)
    }

    /// Convert a normalized rectangle to pixel units of `size`.
    pub fn denormalized(&self, size: Size) -> Rect {
        Rect::new(
            self.x * size.width,
            self.y * size.height,
            self.width * size.width,
            self.height * size.height,
        )
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Uniform scale applied to an image before inference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleTransform {
    scale: f64,
}

impl ScaleTransform {
    pub fn identity() -> Self {
        Self { scale: 1.0 }
    }

    pub fn uniform(scale: f64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
    }

    pub fn inverted(&self) -> Self {
        if self.is_identity() {
            return *self;
        }
        Self {
            scale: 1.0 / self.scale,
        }
    }

    pub fn apply_size(&self, size: Size) -> Size {
        Size::new(size.width * self.scale, size.height * self.scale)
    }

    pub fn apply_rect(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x * self.scale,
            rect.y * self.scale,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }
}

impl Default for ScaleTransform {
    fn default() -> Self {
        Self::identity()
    }
}
