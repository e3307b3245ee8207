use serde::{Deserialize, Serialize};

use crate::detect::backend::Observation;
use crate::geometry::{Rect, ScaleTransform, Size};

/// A detected spoof device.
///
/// The bounding box is in pixel coordinates (top-left origin) of whichever
/// image it was computed against. No image metadata is carried, so callers
/// must keep track of which image a detection belongs to.
///
/// Serialized as
/// `{"boundingBox": {"x", "y", "width", "height"}, "confidence"}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedSpoof {
    bounding_box: Rect,
    /// 0.0 to 1.0; 1.0 means full confidence the box holds a spoof device.
    confidence: f32,
}

impl DetectedSpoof {
    pub fn new(bounding_box: Rect, confidence: f32) -> Self {
        Self {
            bounding_box,
            confidence,
        }
    }

    /// Convert a backend observation into pixel space of an image of
    /// `image_size`.
    ///
    /// The normalized box is flipped vertically (`y = 1 - maxY`) before it is
    /// denormalized, turning the bottom-left origin into a top-left one.
    pub fn from_observation(observation: &Observation, image_size: Size) -> Self {
        let normalized = observation.bounding_box;
        let flipped = Rect::new(
            normalized.min_x(),
            1.0 - normalized.max_y(),
            normalized.width,
            normalized.height,
        );
        Self {
            bounding_box: flipped.denormalized(image_size),
            confidence: observation.confidence,
        }
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounding_box
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Mirror the bounding box along the image's vertical axis.
    ///
    /// Useful when detection ran on an image mirrored for display, e.g. a
    /// selfie capture.
    pub fn flipped(&self, image_size: Size) -> Self {
        Self {
            bounding_box: self.bounding_box.mirrored_horizontally(image_size),
            confidence: self.confidence,
        }
    }

    pub(crate) fn scaled(&self, transform: ScaleTransform) -> Self {
        if transform.is_identity() {
            return *self;
        }
        Self {
            bounding_box: transform.apply_rect(self.bounding_box),
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_is_flipped_before_denormalizing() {
        let observation = Observation::new(Rect::new(0.1, 0.6, 0.2, 0.3), 0.8);
        let detected = DetectedSpoof::from_observation(&observation, Size::new(200.0, 100.0));
        // 1 - (0.6 + 0.3) = 0.1 from the top
        assert!(detected
            .bounding_box()
            .approx_eq(&Rect::new(20.0, 10.0, 40.0, 30.0), 1e-9));
        assert_eq!(detected.confidence(), 0.8);
    }

    #[test]
    fn box_touching_bottom_edge_maps_to_image_bottom() {
        let observation = Observation::new(Rect::new(0.0, 0.0, 1.0, 0.25), 0.5);
        let detected = DetectedSpoof::from_observation(&observation, Size::new(640.0, 480.0));
        assert!(detected
            .bounding_box()
            .approx_eq(&Rect::new(0.0, 360.0, 640.0, 120.0), 1e-9));
    }

    #[test]
    fn flipping_twice_restores_box() {
        let size = Size::new(1280.0, 720.0);
        let detected = DetectedSpoof::new(Rect::new(100.5, 20.25, 300.0, 400.0), 0.7);
        let once = detected.flipped(size);
        assert!(once
            .bounding_box()
            .approx_eq(&Rect::new(879.5, 20.25, 300.0, 400.0), 1e-9));
        let twice = once.flipped(size);
        assert!(twice.bounding_box().approx_eq(&detected.bounding_box(), 1e-9));
        assert_eq!(twice.confidence(), detected.confidence());
    }

    #[test]
    fn serializes_as_flat_object_with_nested_box() {
        let detected = DetectedSpoof::new(Rect::new(1.5, 2.0, 30.0, 40.0), 0.75);
        let value = serde_json::to_value(detected).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "confidence": 0.75,
                "boundingBox": {"x": 1.5, "y": 2.0, "width": 30.0, "height": 40.0}
            })
        );

        let decoded: DetectedSpoof = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, detected);
    }

    #[test]
    fn rejects_missing_box_fields() {
        let err = serde_json::from_str::<DetectedSpoof>(
            r#"{"confidence": 0.5, "boundingBox": {"x": 1, "y": 2, "width": 3}}"#,
        );
        assert!(err.is_err());
    }
}
