//! Spoof device detection
//!
//! Detects devices presented to a camera in place of a live face (phone and
//! tablet screens, printed photographs) as part of a liveness pipeline.
//!
//! # Architecture
//!
//! Detection itself is delegated to an [`InferenceBackend`]; this crate
//! handles everything around it:
//!
//! 1. **Preprocessing**: images whose longer side exceeds the limit (4000 px
//!    by default) are downscaled and the scale is recorded.
//! 2. **Serialized inference**: each detector owns one worker thread that
//!    runs the backend, one request at a time.
//! 3. **Coordinate mapping**: normalized, bottom-left-origin model boxes are
//!    flipped, denormalized and scaled back into pixel coordinates of the
//!    original image.
//! 4. **Filtering**: detections without positive confidence are dropped;
//!    [`SpoofDeviceDetector::detect_spoof_in_image`] reduces the rest to one
//!    score, optionally restricted to a region of interest.
//!
//! # Module Structure
//!
//! - `geometry`: Rect, Size, Point, ScaleTransform
//! - `frame`: ImageFrame and orientation metadata
//! - `preprocess`: downscaling of oversized images
//! - `detect`: backends, the inference worker, DetectedSpoof and the detector
//! - `liveness`: the SpoofDetector contract
//! - `config`: layered detector configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod liveness;
pub mod preprocess;

pub use config::DetectorConfig;
pub use detect::{
    DetectedSpoof, InferenceBackend, Observation, SpoofDeviceDetector, StubBackend,
    BUNDLED_MODEL_NAME,
};
pub use error::{Error, ImageProcessingError, Result, SpoofDeviceDetectorError};
pub use frame::{ImageFrame, Orientation};
pub use geometry::{Point, Rect, ScaleTransform, Size};
pub use liveness::SpoofDetector;
pub use preprocess::{PreparedImage, Preprocessor, DEFAULT_MAX_SIDE_LENGTH};

#[cfg(feature = "backend-tract")]
pub use detect::backends::TractBackend;
