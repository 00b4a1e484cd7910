use std::env;
use std::path::{Path, PathBuf};

use crate::inference::config::PipelineConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse pipeline config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub static_dir: PathBuf,
    pub database_url: String,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Reads the environment (after `.env` has been applied) and the pipeline file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = match env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidVar { name: "PORT", value })?,
            Err(_) => 8081,
        };

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidVar {
                name: "JWT_SECRET",
                value: "<empty>".to_string(),
            });
        }

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://users.db".to_string());
        let pipeline_path =
            env::var("PIPELINE_CONFIG").unwrap_or_else(|_| "config/pipeline.yaml".to_string());

        let mut pipeline = PipelineConfig::load(Path::new(&pipeline_path))?;
        if let Ok(model_path) = env::var("MODEL_PATH") {
            log::info!("MODEL_PATH overrides pipeline model path: {}", model_path);
            pipeline.model.path = PathBuf::from(model_path);
        }

        Ok(Self {
            port,
            jwt_secret,
            static_dir: PathBuf::from(static_dir),
            database_url,
            pipeline,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
