use crate::config::TrainingConfig;
use crate::dataset::{self, HistoricalRecord};
use crate::error::{AppError, Result};
use crate::ml::encoder::JurisdictionEncoder;
use crate::ml::models::{GroupDataset, RegressionMetrics};
use crate::ml::regressor::DiversionRegressor;
use crate::store::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Below this row count a fit is degenerate or unstable. Such groups are
/// still trained and persisted; the threshold only drives a warning so
/// callers know to distrust the metrics.
const MIN_STABLE_SAMPLES: usize = 5;

/// Per-group training outcome returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Business group the model was trained for
    pub business_group: String,

    /// Storage key the model artifact was persisted under
    pub storage_key: String,

    /// Total rows for the group
    pub n_samples: usize,

    /// Rows used for fitting
    pub n_training_samples: usize,

    /// Rows held out for evaluation (0 means in-sample diagnostics)
    pub n_holdout_samples: usize,

    /// Evaluation metrics
    pub metrics: RegressionMetrics,
}

/// Offline training pipeline: one linear model per business group.
///
/// Fits the jurisdiction encoder once on the full dataset, then trains,
/// evaluates, and persists a model for every distinct business group. Runs
/// strictly before any prediction; the artifacts it writes are read-only
/// afterwards.
#[derive(Debug)]
pub struct TrainingPipeline {
    store: ArtifactStore,
    test_fraction: f64,
    split_seed: u64,
}

impl TrainingPipeline {
    pub fn new(store: ArtifactStore, training: &TrainingConfig) -> Result<Self> {
        if !(0.0..1.0).contains(&training.test_fraction) {
            return Err(AppError::Validation(format!(
                "test_fraction must be in [0, 1), got {}",
                training.test_fraction
            )));
        }

        Ok(Self {
            store,
            test_fraction: training.test_fraction,
            split_seed: training.split_seed,
        })
    }

    /// Train and persist one model per distinct business group.
    ///
    /// Every group is persisted regardless of fit quality; even a poor model
    /// must exist so each group stays predictable. Returns per-group reports
    /// keyed by business-group name.
    pub fn train_all(
        &self,
        records: &[HistoricalRecord],
    ) -> Result<BTreeMap<String, TrainingReport>> {
        if records.is_empty() {
            return Err(AppError::Validation(
                "historical dataset has no rows".to_string(),
            ));
        }

        self.store.ensure_layout()?;

        // The encoder is fit exactly once, on every jurisdiction in the
        // dataset, and persisted before any model references its codes.
        let encoder = JurisdictionEncoder::fit(records.iter().map(|r| r.jurisdiction.as_str()));
        self.store.save_encoder(&encoder)?;
        info!(
            n_jurisdictions = encoder.len(),
            "jurisdiction encoder fitted and persisted"
        );

        let groups = dataset::business_groups(records);
        info!(n_groups = groups.len(), "training per-group models");

        let mut reports = BTreeMap::new();
        for group in &groups {
            let report = self.train_group(group, records, &encoder)?;
            reports.insert(group.clone(), report);
        }

        info!(n_models = reports.len(), "training pipeline completed");
        Ok(reports)
    }

    fn train_group(
        &self,
        group: &str,
        records: &[HistoricalRecord],
        encoder: &JurisdictionEncoder,
    ) -> Result<TrainingReport> {
        let rows: Vec<&HistoricalRecord> = records
            .iter()
            .filter(|r| r.business_group == group)
            .collect();

        if rows.len() < MIN_STABLE_SAMPLES {
            warn!(
                group,
                n_samples = rows.len(),
                "group has very few rows; fit will be unstable and its metrics untrustworthy"
            );
        }

        let table = GroupDataset::from_records(&rows, encoder)?;
        let (train, holdout) = table.train_test_split(self.test_fraction, self.split_seed);

        let mut model = DiversionRegressor::fit(group, &train)?;

        let metrics = if holdout.n_samples == 0 {
            warn!(
                group,
                "held-out subset is empty; reporting in-sample diagnostics"
            );
            model.evaluate(&train)?
        } else {
            model.evaluate(&holdout)?
        };
        model.set_holdout_metrics(metrics.clone(), holdout.n_samples);

        self.store.save_model(group, &model)?;

        info!(
            group,
            n_samples = table.n_samples,
            mae = metrics.mae,
            mse = metrics.mse,
            r2 = metrics.r2,
            "group model trained and persisted"
        );

        Ok(TrainingReport {
            business_group: group.to_string(),
            storage_key: ArtifactStore::sanitize_key(group),
            n_samples: table.n_samples,
            n_training_samples: train.n_samples,
            n_holdout_samples: holdout.n_samples,
            metrics,
        })
    }
}
