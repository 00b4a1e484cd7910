use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

pub const DEFAULT_MODEL_PATH: &str = "models/alzheimers_model.onnx";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub preprocessing: PreprocessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub resize_method: ResizeMethod,
}

/// Resampling filter applied when scaling uploads to the model input size.
///
/// Must match the interpolation used when the training images were prepared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeMethod {
    pub fn filter(self) -> FilterType {
        match self {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Triangle => FilterType::Triangle,
            ResizeMethod::CatmullRom => FilterType::CatmullRom,
            ResizeMethod::Gaussian => FilterType::Gaussian,
            ResizeMethod::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl PipelineConfig {
    /// Reads the pipeline file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Pipeline config {} not found, using defaults (model: {}, resize: nearest)",
                path.display(),
                DEFAULT_MODEL_PATH
            );
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&config_str)?;
        log::info!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config = PipelineConfig::from_yaml(
            "model:\n  path: /srv/models/scan.pt\npreprocessing:\n  resize_method: lanczos3\n",
        )
        .unwrap();
        assert_eq!(config.model.path, PathBuf::from("/srv/models/scan.pt"));
        assert_eq!(config.preprocessing.resize_method, ResizeMethod::Lanczos3);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = PipelineConfig::from_yaml("model:\n  path: other.pt\n").unwrap();
        assert_eq!(config.model.path, PathBuf::from("other.pt"));
        assert_eq!(config.preprocessing.resize_method, ResizeMethod::Nearest);
    }

    #[test]
    fn unknown_resize_method_is_rejected() {
        let err = PipelineConfig::from_yaml("preprocessing:\n  resize_method: bicubic\n");
        assert!(matches!(err, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn absent_file_falls_back_to_defaults() {
        let config = PipelineConfig::load(Path::new("/nonexistent/pipeline.yaml")).unwrap();
        assert_eq!(config.model.path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.preprocessing.resize_method.filter(), FilterType::Nearest);
    }
}
