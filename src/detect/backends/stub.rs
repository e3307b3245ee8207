use anyhow::Result;

use crate::detect::backend::{InferenceBackend, Observation};
use crate::frame::ImageFrame;

/// Stub backend for testing. Returns the same scripted observations for
/// every image, independent of its size, like a model that sees the same
/// normalized scene at any resolution.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    observations: Vec<Observation>,
    calls: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observations(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, _frame: &ImageFrame) -> Result<Vec<Observation>> {
        self.calls += 1;
        Ok(self.observations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn stub_replays_observations() {
        let obs = Observation::new(Rect::new(0.1, 0.2, 0.3, 0.4), 0.9);
        let mut backend = StubBackend::with_observations(vec![obs]);
        let frame = ImageFrame::from_rgb(vec![0; 12], 2, 2).unwrap();

        assert_eq!(backend.infer(&frame).unwrap(), vec![obs]);
        assert_eq!(backend.infer(&frame).unwrap(), vec![obs]);
        assert_eq!(backend.calls(), 2);
        assert!(StubBackend::new().infer(&frame).unwrap().is_empty());
    }
}
