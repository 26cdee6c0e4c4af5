use crate::error::{AppError, Result};
use crate::ml::models::{
    DiversionEstimate, GroupDataset, ModelMetadata, RegressionMetrics, N_FEATURES, N_TARGETS,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};

type OlsModel = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Fitted diversion model for one business group.
///
/// Three independent ordinary-least-squares fits, one per tonnage label, over
/// the two input features (employee count, jurisdiction code). Independent
/// per-label fits are numerically equivalent to a joint multi-output OLS.
/// Immutable after training; retraining produces a full replacement artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiversionRegressor {
    /// Model metadata
    metadata: ModelMetadata,

    /// One fitted model per target column, in fixed target order
    models: Vec<OlsModel>,
}

impl DiversionRegressor {
    /// Fit the per-label regressions on a group's training subset.
    pub fn fit(business_group: &str, train: &GroupDataset) -> Result<Self> {
        if train.n_samples == 0 {
            return Err(AppError::Internal(format!(
                "no training rows for business group '{}'",
                business_group
            )));
        }

        let x = Self::ndarray_to_densematrix(&train.features);
        let mut models = Vec::with_capacity(N_TARGETS);

        // SVD tolerates the rank-deficient matrices that tiny or
        // single-jurisdiction groups produce; such groups are trained anyway.
        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);

        for t in 0..N_TARGETS {
            let y: Vec<f64> = train.labels.column(t).to_vec();
            let model =
                LinearRegression::fit(&x, &y, params.clone()).map_err(|e| {
                    AppError::Internal(format!(
                        "least-squares fit failed for '{}': {}",
                        business_group, e
                    ))
                })?;
            models.push(model);
        }

        Ok(Self {
            metadata: ModelMetadata {
                business_group: business_group.to_string(),
                trained_at: chrono::Utc::now(),
                n_training_samples: train.n_samples,
                n_holdout_samples: 0,
                n_features: N_FEATURES,
                holdout_metrics: RegressionMetrics::zeroed(),
            },
            models,
        })
    }

    /// Predict all three labels for each feature row.
    pub fn predict_rows(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        let x = Self::ndarray_to_densematrix(features);
        let mut predictions = Array2::zeros((features.nrows(), N_TARGETS));

        for (t, model) in self.models.iter().enumerate() {
            let column = model
                .predict(&x)
                .map_err(|e| AppError::Internal(format!("prediction failed: {}", e)))?;
            for (i, value) in column.into_iter().enumerate() {
                predictions[[i, t]] = value;
            }
        }

        Ok(predictions)
    }

    /// Predict the three tonnages for a single business.
    pub fn predict_one(
        &self,
        employee_count: f64,
        jurisdiction_code: f64,
    ) -> Result<DiversionEstimate> {
        let features =
            Array2::from_shape_vec((1, N_FEATURES), vec![employee_count, jurisdiction_code])
                .map_err(|e| AppError::Internal(format!("failed to build feature row: {}", e)))?;
        let predictions = self.predict_rows(&features)?;

        Ok(DiversionEstimate {
            tons_curbside_recycle: predictions[[0, 0]],
            tons_curbside_organics: predictions[[0, 1]],
            tons_other_diversion: predictions[[0, 2]],
        })
    }

    /// Compute evaluation metrics on a held-out subset.
    pub fn evaluate(&self, holdout: &GroupDataset) -> Result<RegressionMetrics> {
        if holdout.n_samples == 0 {
            return Err(AppError::Validation(
                "cannot evaluate on an empty subset".to_string(),
            ));
        }
        let predictions = self.predict_rows(&holdout.features)?;
        Ok(RegressionMetrics::evaluate(&holdout.labels, &predictions))
    }

    /// Record held-out diagnostics in the model metadata.
    pub fn set_holdout_metrics(&mut self, metrics: RegressionMetrics, n_holdout_samples: usize) {
        self.metadata.holdout_metrics = metrics;
        self.metadata.n_holdout_samples = n_holdout_samples;
    }

    /// Get model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
        let shape = arr.shape();
        let data: Vec<f64> = arr.iter().copied().collect();
        DenseMatrix::new(shape[0], shape[1], data, false)
    }
}
