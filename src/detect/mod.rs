mod backend;
pub mod backends;
mod detector;
mod result;
mod worker;

pub use backend::{InferenceBackend, Observation};
pub use backends::StubBackend;
pub use detector::{
    max_confidence_in_region, SpoofDeviceDetector, BUNDLED_MODEL_NAME,
    DEFAULT_CONFIDENCE_THRESHOLD, MODEL_EXTENSION,
};
pub use result::DetectedSpoof;
pub use worker::{InferenceWorker, WorkerHandle};
