/// Regression core for waste diversion estimation
///
/// This module provides the per-business-group modeling pipeline:
/// - Jurisdiction label encoding with strict unknown rejection
/// - Feature/label table assembly with a seeded train/held-out split
/// - Ordinary-least-squares fits, one per tonnage label
/// - Held-out MAE/MSE/R² diagnostics
/// - Load-only prediction over persisted artifacts

pub mod encoder;
pub mod models;
pub mod pipeline;
pub mod regressor;
pub mod service;

pub use encoder::JurisdictionEncoder;
pub use models::{
    DiversionEstimate, GroupDataset, ModelMetadata, RegressionMetrics, TargetMetrics,
    N_FEATURES, N_TARGETS, TARGET_COLUMNS,
};
pub use pipeline::{TrainingPipeline, TrainingReport};
pub use regressor::DiversionRegressor;
pub use service::PredictionService;
