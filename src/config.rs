use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::preprocess::DEFAULT_MAX_SIDE_LENGTH;

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    dir: Option<PathBuf>,
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    max_side_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Directory searched for the packaged model.
    pub model_dir: PathBuf,
    /// Explicit model file; takes precedence over `model_dir`.
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub max_side_length: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from_file(DetectorConfigFile::default())
    }
}

impl DetectorConfig {
    /// Defaults, then the TOML file named by `SPOOF_CONFIG`, then `SPOOF_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SPOOF_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DetectorConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        Self {
            model_dir: model.dir.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            model_path: model.path,
            input_width: model.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
            input_height: model.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
            confidence_threshold: detection
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            max_side_length: detection.max_side_length.unwrap_or(DEFAULT_MAX_SIDE_LENGTH),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("SPOOF_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("SPOOF_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(threshold) = std::env::var("SPOOF_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("SPOOF_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        if let Ok(max_side) = std::env::var("SPOOF_MAX_SIDE_LENGTH") {
            self.max_side_length = max_side
                .trim()
                .parse()
                .map_err(|_| anyhow!("SPOOF_MAX_SIDE_LENGTH must be an integer number of pixels"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            ));
        }
        if self.max_side_length == 0 {
            return Err(anyhow!("max side length must be greater than zero"));
        }
        if self.input_width == 0 || self.input_height == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
