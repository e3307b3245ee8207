use std::path::{Path, PathBuf};

use crate::detect::backend::InferenceBackend;
use crate::detect::result::DetectedSpoof;
use crate::detect::worker::{InferenceWorker, WorkerHandle};
use crate::error::{Error, Result, SpoofDeviceDetectorError};
use crate::frame::ImageFrame;
use crate::geometry::Rect;
use crate::preprocess::Preprocessor;

/// Name of the model packaged for this crate. Used verbatim as the detector
/// identifier when loaded through [`SpoofDeviceDetector::bundled`].
pub const BUNDLED_MODEL_NAME: &str = "ARC_PSD-001_1.4.151_lst_yl82087_NMS_ult087_cml72";

/// File extension of portable model packages.
pub const MODEL_EXTENSION: &str = "onnx";

/// Default confidence threshold exposed to liveness pipelines.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Detects spoof devices like smartphones, tablets or photographs.
///
/// Each detector owns one inference worker thread; calls on the same
/// instance are processed strictly one at a time, separate instances run
/// independently.
pub struct SpoofDeviceDetector {
    identifier: String,
    confidence_threshold: f32,
    preprocessor: Preprocessor,
    worker: InferenceWorker,
}

impl SpoofDeviceDetector {
    /// Wrap an already compiled and loaded backend.
    pub fn from_compiled<B: InferenceBackend + 'static>(
        backend: B,
        identifier: impl Into<String>,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let worker = InferenceWorker::spawn(backend, &identifier)?;
        log::info!(
            "spoof device detector ready: {} ({} backend)",
            identifier,
            worker.backend_name()
        );
        Ok(Self {
            identifier,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            preprocessor: Preprocessor::default(),
            worker,
        })
    }

    /// Compile the ONNX model at `model_path` and load it. The file name
    /// becomes the identifier.
    #[cfg(feature = "backend-tract")]
    pub fn from_model_path<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        use crate::detect::backends::tract::DEFAULT_INPUT_SIZE;
        Self::from_model_path_with_input(model_path, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
    }

    #[cfg(feature = "backend-tract")]
    pub fn from_model_path_with_input<P: AsRef<Path>>(
        model_path: P,
        input_width: u32,
        input_height: u32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(SpoofDeviceDetectorError::ModelNotFound {
                path: model_path.to_path_buf(),
            }
            .into());
        }
        let identifier = model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("compiling model {}", model_path.display());
        let backend = crate::detect::backends::TractBackend::compile(
            model_path,
            input_width,
            input_height,
        )
        .map_err(Error::Model)?;
        Self::from_compiled(backend, identifier)
    }

    /// Async variant of [`Self::from_model_path`]. Compilation runs on the
    /// Tokio blocking pool; must be called from within a Tokio runtime.
    #[cfg(feature = "backend-tract")]
    pub async fn from_model_path_async(model_path: PathBuf) -> Result<Self> {
        run_blocking(move || Self::from_model_path(model_path)).await
    }

    /// Location of the packaged model inside `model_dir`.
    pub fn bundled_model_path<P: AsRef<Path>>(model_dir: P) -> Result<PathBuf> {
        let path = model_dir
            .as_ref()
            .join(format!("{}.{}", BUNDLED_MODEL_NAME, MODEL_EXTENSION));
        if !path.is_file() {
            return Err(SpoofDeviceDetectorError::ModelNotFound { path }.into());
        }
        Ok(path)
    }

    /// Load the packaged model from `model_dir`.
    #[cfg(feature = "backend-tract")]
    pub fn bundled<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let path = Self::bundled_model_path(model_dir)?;
        let mut detector = Self::from_model_path(path)?;
        detector.identifier = BUNDLED_MODEL_NAME.to_string();
        Ok(detector)
    }

    #[cfg(feature = "backend-tract")]
    pub async fn bundled_async(model_dir: PathBuf) -> Result<Self> {
        run_blocking(move || Self::bundled(model_dir)).await
    }

    /// Build a detector from layered configuration. An explicit model path
    /// wins over the packaged model in the model directory.
    #[cfg(feature = "backend-tract")]
    pub fn from_config(config: &crate::config::DetectorConfig) -> Result<Self> {
        let mut detector = match &config.model_path {
            Some(path) => {
                Self::from_model_path_with_input(path, config.input_width, config.input_height)?
            }
            None => {
                let path = Self::bundled_model_path(&config.model_dir)?;
                let mut detector =
                    Self::from_model_path_with_input(path, config.input_width, config.input_height)?;
                detector.identifier = BUNDLED_MODEL_NAME.to_string();
                detector
            }
        };
        detector.set_confidence_threshold(config.confidence_threshold);
        detector.set_max_side_length(config.max_side_length);
        Ok(detector)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Threshold surfaced to liveness pipelines. Detection results are not
    /// filtered by it; comparing against it is left to the caller.
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold;
    }

    pub fn max_side_length(&self) -> u32 {
        self.preprocessor.max_side_length()
    }

    pub fn set_max_side_length(&mut self, max_side_length: u32) {
        self.preprocessor.set_max_side_length(max_side_length);
    }

    /// Detect spoof devices in `frame`.
    ///
    /// Boxes are reported in pixel coordinates of `frame` as displayed.
    /// Only detections with positive confidence are returned.
    pub fn detect_spoof_devices(&self, frame: &ImageFrame) -> Result<Vec<DetectedSpoof>> {
        detect_with(&self.worker.handle()?, &self.preprocessor, frame)
    }

    /// Async variant of [`Self::detect_spoof_devices`]; the calling task
    /// yields while the request waits in the queue and runs.
    pub async fn detect_spoof_devices_async(
        &self,
        frame: ImageFrame,
    ) -> Result<Vec<DetectedSpoof>> {
        let handle = self.worker.handle()?;
        let preprocessor = self.preprocessor;
        run_blocking(move || detect_with(&handle, &preprocessor, &frame)).await
    }

    /// Highest spoof device confidence in `frame`, optionally restricted to
    /// detections covering the centre of `region_of_interest`. Returns 0 when
    /// nothing qualifies.
    pub fn detect_spoof_in_image(
        &self,
        frame: &ImageFrame,
        region_of_interest: Option<Rect>,
    ) -> Result<f32> {
        let detections = self.detect_spoof_devices(frame)?;
        Ok(max_confidence_in_region(&detections, region_of_interest))
    }

    pub async fn detect_spoof_in_image_async(
        &self,
        frame: ImageFrame,
        region_of_interest: Option<Rect>,
    ) -> Result<f32> {
        let detections = self.detect_spoof_devices_async(frame).await?;
        Ok(max_confidence_in_region(&detections, region_of_interest))
    }
}

/// Max confidence among detections whose box contains the centre of
/// `region_of_interest` (all detections when it is `None`).
pub fn max_confidence_in_region(detections: &[DetectedSpoof], region_of_interest: Option<Rect>) -> f32 {
    let centre = region_of_interest.map(|roi| roi.center());
    detections
        .iter()
        .filter(|d| centre.map_or(true, |c| d.bounding_box().contains(c)))
        .map(|d| d.confidence())
        .fold(None, |best: Option<f32>, c| Some(best.map_or(c, |b| b.max(c))))
        .unwrap_or(0.0)
}

fn detect_with(
    worker: &WorkerHandle,
    preprocessor: &Preprocessor,
    frame: &ImageFrame,
) -> Result<Vec<DetectedSpoof>> {
    let prepared = preprocessor.prepare(frame)?;
    let transform = prepared.transform;
    let scaled_size = transform.apply_size(frame.size());
    let inverse = transform.inverted();

    let observations = worker.infer(prepared.frame)?;
    let total = observations.len();
    let detections: Vec<DetectedSpoof> = observations
        .iter()
        .map(|o| DetectedSpoof::from_observation(o, scaled_size).scaled(inverse))
        .filter(|d| d.confidence() > 0.0)
        .collect();
    log::debug!(
        "{} of {} observations kept for {}x{} image (scale {:.4})",
        detections.len(),
        total,
        frame.size().width,
        frame.size().height,
        transform.scale()
    );
    Ok(detections)
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(Error::WorkerUnavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backend::Observation;
    use crate::detect::backends::StubBackend;
    use crate::error::ImageProcessingError;

    fn frame(width: u32, height: u32) -> ImageFrame {
        ImageFrame::from_rgb(vec![0; (width * height * 3) as usize], width, height).unwrap()
    }

    #[test]
    fn region_of_interest_selects_box_under_its_centre() {
        let detections = vec![
            DetectedSpoof::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9),
            DetectedSpoof::new(Rect::new(20.0, 20.0, 10.0, 10.0), 0.99),
        ];
        let roi = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(max_confidence_in_region(&detections, Some(roi)), 0.9);
        assert_eq!(max_confidence_in_region(&detections, None), 0.99);
        let elsewhere = Rect::new(100.0, 100.0, 4.0, 4.0);
        assert_eq!(max_confidence_in_region(&detections, Some(elsewhere)), 0.0);
        assert_eq!(max_confidence_in_region(&[], None), 0.0);
    }

    #[test]
    fn non_positive_confidence_is_dropped() {
        let backend = StubBackend::with_observations(vec![
            Observation::new(Rect::new(0.0, 0.0, 0.5, 0.5), 0.0),
            Observation::new(Rect::new(0.5, 0.5, 0.5, 0.5), 0.4),
            Observation::new(Rect::new(0.1, 0.1, 0.1, 0.1), -0.2),
        ]);
        let detector = SpoofDeviceDetector::from_compiled(backend, "stub").unwrap();
        let detections = detector.detect_spoof_devices(&frame(100, 100)).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(detections.iter().all(|d| d.confidence() > 0.0));
        assert!(detections[0]
            .bounding_box()
            .approx_eq(&Rect::new(50.0, 0.0, 50.0, 50.0), 1e-9));
    }

    #[test]
    fn threshold_is_configuration_only() {
        let backend = StubBackend::with_observations(vec![Observation::new(
            Rect::new(0.0, 0.0, 1.0, 1.0),
            0.1,
        )]);
        let mut detector = SpoofDeviceDetector::from_compiled(backend, "stub").unwrap();
        assert_eq!(detector.confidence_threshold(), 0.5);
        detector.set_confidence_threshold(0.9);
        assert_eq!(detector.confidence_threshold(), 0.9);
        assert_eq!(detector.detect_spoof_devices(&frame(8, 8)).unwrap().len(), 1);
        assert_eq!(detector.detect_spoof_in_image(&frame(8, 8), None).unwrap(), 0.1);
    }

    #[test]
    fn missing_bundled_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        match SpoofDeviceDetector::bundled_model_path(dir.path()) {
            Err(Error::Detector(SpoofDeviceDetectorError::ModelNotFound { path })) => {
                assert!(path.ends_with(format!("{}.onnx", BUNDLED_MODEL_NAME)));
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }

    #[test]
    fn zero_max_side_length_fails_detection() {
        let mut detector = SpoofDeviceDetector::from_compiled(StubBackend::new(), "stub").unwrap();
        detector.set_max_side_length(0);
        assert!(matches!(
            detector.detect_spoof_devices(&frame(20, 10)),
            Err(Error::Image(ImageProcessingError::ZeroMaxSideLength))
        ));
        detector.set_max_side_length(10);
        assert!(detector.detect_spoof_devices(&frame(20, 10)).is_ok());
    }

    #[test]
    fn identifier_with_nul_byte_is_accepted() {
        let detector =
            SpoofDeviceDetector::from_compiled(StubBackend::new(), "model\0v2").unwrap();
        assert_eq!(detector.identifier(), "model\0v2");
        assert!(detector.detect_spoof_devices(&frame(4, 4)).unwrap().is_empty());
    }

    struct RejectsTinyImages;

    impl InferenceBackend for RejectsTinyImages {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn infer(&mut self, frame: &ImageFrame) -> anyhow::Result<Vec<Observation>> {
            if frame.pixel_size().0 < 2 {
                anyhow::bail!("image too small for model");
            }
            Ok(vec![Observation::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0.5)])
        }
    }

    #[test]
    fn failed_call_leaves_detector_usable() {
        let detector = SpoofDeviceDetector::from_compiled(RejectsTinyImages, "picky").unwrap();
        assert!(matches!(
            detector.detect_spoof_devices(&frame(1, 1)),
            Err(Error::Inference(_))
        ));
        assert_eq!(detector.detect_spoof_devices(&frame(4, 4)).unwrap().len(), 1);
        assert!(matches!(
            ImageFrame::from_rgb(vec![0; 3], 4, 4),
            Err(ImageProcessingError::ConversionFailed)
        ));
    }
}
