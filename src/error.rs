use std::path::PathBuf;

use thiserror::Error;

/// The input image could not be turned into a pixel buffer the backend accepts.
#[derive(Debug, Error)]
pub enum ImageProcessingError {
    #[error("image could not be converted to an RGB pixel buffer")]
    ConversionFailed,

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("max side length must be greater than zero")]
    ZeroMaxSideLength,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Detector-level failures that make an instance unusable.
#[derive(Debug, Error)]
pub enum SpoofDeviceDetectorError {
    #[error("model not found at {}", path.display())]
    ModelNotFound { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Image(#[from] ImageProcessingError),

    #[error(transparent)]
    Detector(#[from] SpoofDeviceDetectorError),

    /// Model compilation or loading failed inside the backend.
    #[error(transparent)]
    Model(anyhow::Error),

    /// The backend failed while running inference.
    #[error(transparent)]
    Inference(anyhow::Error),

    #[error("inference worker is no longer running")]
    WorkerUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
