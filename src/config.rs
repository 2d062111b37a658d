use crate::ml::{ForestConfig, TrainingOptions};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Model artifact configuration
    pub model: ModelConfig,

    /// Offline training configuration
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Embedded defaults, then the file at `config_path` if present, then
    /// `DRS__SECTION__KEY` environment variables
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DRS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Most patients accepted by one batch request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Trained model artifact loaded at startup
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Historical patient CSV
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Fraction of rows held out for testing
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Cross-validation folds
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    /// Seed for splitting and evaluation
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Random forest hyperparameters
    #[serde(default)]
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            test_size: default_test_size(),
            cv_folds: default_cv_folds(),
            seed: default_seed(),
            forest: ForestConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn to_options(&self) -> TrainingOptions {
        TrainingOptions {
            test_size: self.test_size,
            cv_folds: self.cv_folds,
            seed: self.seed,
            forest: self.forest.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_artifact_path() -> String {
    "models/random_forest_model.bin".to_string()
}

fn default_dataset_path() -> String {
    "data/diabetics-dataset.csv".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_cv_folds() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
