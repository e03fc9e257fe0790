use dermalens_core::config::{CaptureConfig, ConfigError};
use std::path::PathBuf;

/// Process settings, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Optional TOML file overriding capture thresholds.
    pub config_path: Option<PathBuf>,
    /// Where capture JPEGs are written.
    pub output_dir: PathBuf,
}

impl RuntimeConfig {
    /// Load configuration from `DERMALENS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            camera_device: std::env::var("DERMALENS_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            config_path: env_path("DERMALENS_CONFIG"),
            output_dir: env_path("DERMALENS_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Thresholds from `config_path`, or the built-in defaults.
    pub fn load_capture_config(&self) -> Result<CaptureConfig, ConfigError> {
        match &self.config_path {
            Some(path) => CaptureConfig::load(path),
            None => Ok(CaptureConfig::default()),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
