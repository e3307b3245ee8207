//! Contract between spoof detectors and a liveness detection pipeline.

use crate::detect::SpoofDeviceDetector;
use crate::error::Result;
use crate::frame::ImageFrame;
use crate::geometry::Rect;

/// A detector that scores how likely an image shows a spoof instead of a
/// live face.
pub trait SpoofDetector: Send + Sync {
    /// Identifier of the model behind this detector.
    fn identifier(&self) -> &str;

    /// Score above which the pipeline should treat an image as a spoof.
    fn confidence_threshold(&self) -> f32;

    fn set_confidence_threshold(&mut self, threshold: f32);

    /// Spoof score in 0..1 for `frame`, optionally limited to the subject in
    /// `region_of_interest`.
    fn detect_spoof_in_image(
        &self,
        frame: &ImageFrame,
        region_of_interest: Option<Rect>,
    ) -> Result<f32>;

    fn is_spoof(&self, frame: &ImageFrame, region_of_interest: Option<Rect>) -> Result<bool> {
        let score = self.detect_spoof_in_image(frame, region_of_interest)?;
        Ok(score >= self.confidence_threshold())
    }
}

impl SpoofDetector for SpoofDeviceDetector {
    fn identifier(&self) -> &str {
        SpoofDeviceDetector::identifier(self)
    }

    fn confidence_threshold(&self) -> f32 {
        SpoofDeviceDetector::confidence_threshold(self)
    }

    fn set_confidence_threshold(&mut self, threshold: f32) {
        SpoofDeviceDetector::set_confidence_threshold(self, threshold)
    }

    fn detect_spoof_in_image(
        &self,
        frame: &ImageFrame,
        region_of_interest: Option<Rect>,
    ) -> Result<f32> {
        SpoofDeviceDetector::detect_spoof_in_image(self, frame, region_of_interest)
    }
}
