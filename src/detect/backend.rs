use anyhow::Result;

use crate::frame::ImageFrame;
use crate::geometry::Rect;

/// One raw detection as produced by an inference backend.
///
/// `bounding_box` is normalized to 0..1 of the oriented image and uses a
/// bottom-left origin: `y` is the distance of the box's lower edge from the
/// bottom of the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub bounding_box: Rect,
    pub confidence: f32,
}

impl Observation {
    pub fn new(bounding_box: Rect, confidence: f32) -> Self {
        Self {
            bounding_box,
            confidence,
        }
    }
}

/// Object-detection inference over a compiled model.
///
/// Backends are stateful and not re-entrant; the detector only ever calls
/// `infer` from its single worker thread.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model on one image.
    ///
    /// The frame's orientation must be honored so that returned boxes refer
    /// to the image as displayed.
    fn infer(&mut self, frame: &ImageFrame) -> Result<Vec<Observation>>;

    /// Optional warm-up hook, run once on the worker thread before the first
    /// request.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, frame: &ImageFrame) -> Result<Vec<Observation>> {
        (**self).infer(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
