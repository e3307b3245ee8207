use std::sync::Mutex;

use tempfile::NamedTempFile;

use spoof_device_detection::config::DetectorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SPOOF_CONFIG",
        "SPOOF_MODEL_DIR",
        "SPOOF_MODEL_PATH",
        "SPOOF_CONFIDENCE_THRESHOLD",
        "SPOOF_MAX_SIDE_LENGTH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [model]
        dir = "/opt/spoof/models"
        input_width = 416
        input_height = 320

        [detection]
        confidence_threshold = 0.35
        max_side_length = 3000
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("SPOOF_CONFIG", file.path());
    std::env::set_var("SPOOF_MODEL_PATH", "/tmp/custom.onnx");
    std::env::set_var("SPOOF_MAX_SIDE_LENGTH", "2048");

    let cfg = DetectorConfig::load().expect("load config");

    assert_eq!(cfg.model_dir, std::path::PathBuf::from("/opt/spoof/models"));
    assert_eq!(
        cfg.model_path.as_deref(),
        Some(std::path::Path::new("/tmp/custom.onnx"))
    );
    assert_eq!((cfg.input_width, cfg.input_height), (416, 320));
    assert_eq!(cfg.confidence_threshold, 0.35);
    assert_eq!(cfg.max_side_length, 2048);

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DetectorConfig::load().expect("load config");
    assert_eq!(cfg, DetectorConfig::default());
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SPOOF_CONFIDENCE_THRESHOLD", "high");
    let err = DetectorConfig::load().unwrap_err();
    assert!(err.to_string().contains("SPOOF_CONFIDENCE_THRESHOLD"));

    std::env::set_var("SPOOF_CONFIDENCE_THRESHOLD", "1.2");
    assert!(DetectorConfig::load().is_err());

    clear_env();
    std::env::set_var("SPOOF_MAX_SIDE_LENGTH", "0");
    assert!(DetectorConfig::load().is_err());

    clear_env();
}

#[test]
fn malformed_config_file_names_the_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[detection\nmax_side_length = ").expect("write");

    std::env::set_var("SPOOF_CONFIG", file.path());
    let err = DetectorConfig::load().unwrap_err();
    assert!(err
        .to_string()
        .contains(&file.path().display().to_string()));

    clear_env();
}

#[test]
fn explicit_path_ignores_environment() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[detection]\nmax_side_length = 1200\n")
        .expect("write config");
    std::env::set_var("SPOOF_MAX_SIDE_LENGTH", "2048");

    let cfg = DetectorConfig::from_path(file.path()).expect("load config");
    assert_eq!(cfg.max_side_length, 1200);
    assert_eq!(cfg.confidence_threshold, 0.5);

    let mut bad = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut bad, b"[detection]\nmax_side_length = 0\n").expect("write");
    assert!(DetectorConfig::from_path(bad.path()).is_err());

    clear_env();
}
