use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::matcher::DEFAULT_THRESHOLD;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "rollcall"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("ROLLCALL_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/rollcall/config.toml")),
});

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| match option_env!("ROLLCALL_DATA_DIR") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/usr/local/share/rollcall")),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum cosine distance accepted as a match.
    pub threshold: f32,
    /// Directory holding the gallery and attendance log.
    pub store_dir: PathBuf,
    /// YuNet detector ONNX model.
    pub detector_model: PathBuf,
    /// SFace recognizer ONNX model.
    pub recognizer_model: PathBuf,
    /// Minimum detector score for a face candidate.
    pub detection_score: f32,
    pub nms_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            store_dir: DATA_DIR.join("store"),
            detector_model: DATA_DIR.join("models/face_detection_yunet_2023mar.onnx"),
            recognizer_model: DATA_DIR.join("models/face_recognition_sface_2021dec.onnx"),
            detection_score: 0.6,
            nms_threshold: 0.3,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
