use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Historical dataset configuration
    pub dataset: DatasetConfig,

    /// Artifact storage configuration
    pub artifacts: ArtifactConfig,

    /// Training configuration
    pub training: TrainingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: WDP)
            .add_source(
                config::Environment::with_prefix("WDP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the historical records CSV
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding the encoder blob and per-group model blobs
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of each group's rows held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the reproducible train/held-out partition
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
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
}

// Default value functions
fn default_dataset_path() -> PathBuf {
    PathBuf::from("./data/business_groups.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./data/artifacts")
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_split_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}
