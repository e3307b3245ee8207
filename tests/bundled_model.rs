#![cfg(feature = "backend-tract")]

//! Runs the packaged model against the reference capture of a face shown on
//! a tablet. Both files are looked up in `SPOOF_MODEL_DIR`; the test is a
//! no-op when they are not present.

use std::path::PathBuf;

use spoof_device_detection::{
    Error, ImageFrame, SpoofDeviceDetector, SpoofDeviceDetectorError, BUNDLED_MODEL_NAME,
};

const REFERENCE_IMAGE: &str = "face_on_iPad_001.jpg";

fn model_dir() -> Option<PathBuf> {
    let dir = PathBuf::from(std::env::var("SPOOF_MODEL_DIR").ok()?);
    if SpoofDeviceDetector::bundled_model_path(&dir).is_err() || !dir.join(REFERENCE_IMAGE).is_file()
    {
        return None;
    }
    Some(dir)
}

#[test]
fn missing_model_directory_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    match SpoofDeviceDetector::bundled(dir.path()) {
        Err(Error::Detector(SpoofDeviceDetectorError::ModelNotFound { .. })) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("detector created without a model"),
    }
}

#[test]
fn detects_tablet_in_reference_image() {
    let Some(dir) = model_dir() else {
        eprintln!("SPOOF_MODEL_DIR not set or incomplete; skipping");
        return;
    };
    let detector = SpoofDeviceDetector::bundled(&dir).expect("load packaged model");
    assert_eq!(detector.identifier(), BUNDLED_MODEL_NAME);

    let frame = ImageFrame::open(dir.join(REFERENCE_IMAGE)).expect("open reference image");
    let spoofs = detector.detect_spoof_devices(&frame).expect("detect");
    assert_eq!(spoofs.len(), 1);
    assert!((spoofs[0].confidence() - 0.96).abs() <= 0.1);
}

#[tokio::test]
async fn async_construction_matches_blocking() {
    let Some(dir) = model_dir() else {
        return;
    };
    let detector = SpoofDeviceDetector::bundled_async(dir.clone())
        .await
        .expect("load packaged model");
    let frame = ImageFrame::open(dir.join(REFERENCE_IMAGE)).expect("open reference image");
    let score = detector
        .detect_spoof_in_image_async(frame, None)
        .await
        .expect("detect");
    assert!((score - 0.96).abs() <= 0.1);
}
