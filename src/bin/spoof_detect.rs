//! spoof_detect - run spoof device detection on image files
//!
//! Prints one JSON document per image with the detector identifier and the
//! detected spoof devices in pixel coordinates of that image.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use spoof_device_detection::{
    DetectedSpoof, DetectorConfig, ImageFrame, Orientation, Rect, SpoofDeviceDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Images to scan.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// TOML configuration file. Replaces SPOOF_CONFIG and skips the SPOOF_*
    /// environment overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ONNX model file (overrides the packaged model).
    #[arg(long, env = "SPOOF_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Directory holding the packaged model.
    #[arg(long, env = "SPOOF_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Region of interest as x,y,width,height in image pixels; restricts the
    /// spoof score.
    #[arg(long, value_parser = parse_rect, requires = "score")]
    roi: Option<Rect>,

    /// EXIF orientation tag (1-8) applied to every image.
    #[arg(long, default_value_t = 1)]
    orientation: u8,

    /// Report boxes mirrored horizontally (for selfie captures).
    #[arg(long)]
    mirrored: bool,

    /// Also print the spoof score for the region of interest.
    #[arg(long)]
    score: bool,
}

#[derive(Serialize)]
struct ImageReport<'a> {
    image: String,
    identifier: &'a str,
    detections: Vec<DetectedSpoof>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => DetectorConfig::from_path(path)?,
        None => DetectorConfig::load()?,
    };
    if let Some(model) = args.model.clone() {
        cfg.model_path = Some(model);
    }
    if let Some(dir) = args.model_dir.clone() {
        cfg.model_dir = dir;
    }
    let detector = SpoofDeviceDetector::from_config(&cfg)?;
    log::info!(
        "loaded {} (confidence threshold {}, max side {})",
        detector.identifier(),
        detector.confidence_threshold(),
        detector.max_side_length()
    );

    let orientation = Orientation::from_exif(args.orientation);
    for path in &args.images {
        let frame = ImageFrame::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .with_orientation(orientation);
        let size = frame.size();
        let detections = detector.detect_spoof_devices(&frame)?;
        let score = if args.score {
            Some(spoof_device_detection::detect::max_confidence_in_region(
                &detections,
                args.roi,
            ))
        } else {
            None
        };
        let detections = if args.mirrored {
            detections.iter().map(|d| d.flipped(size)).collect()
        } else {
            detections
        };
        let report = ImageReport {
            image: path.display().to_string(),
            identifier: detector.identifier(),
            detections,
            score,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn parse_rect(value: &str) -> Result<Rect> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| anyhow!("expected x,y,width,height numbers, got '{}'", value))?;
    match parts.as_slice() {
        [x, y, w, h] if *w >= 0.0 && *h >= 0.0 => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(anyhow!("expected x,y,width,height with non-negative size, got '{}'", value)),
    }
}
