use crate::dataset::HistoricalRecord;
use crate::error::Result;
use crate::ml::encoder::JurisdictionEncoder;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three output labels, in fixed target order.
pub const TARGET_COLUMNS: [&str; 3] = [
    "Tons Curbside Recycle",
    "Tons Curbside Organics",
    "Tons Other Diversion",
];

/// Input features: employee count and encoded jurisdiction.
pub const N_FEATURES: usize = 2;

/// Output labels: the three tonnage columns.
pub const N_TARGETS: usize = 3;

/// Predicted diversion tonnage for a single business.
///
/// Always carries exactly the three output labels. Values are generally
/// non-negative, though the linear model offers no hard floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversionEstimate {
    #[serde(rename = "Tons Curbside Recycle")]
    pub tons_curbside_recycle: f64,

    #[serde(rename = "Tons Curbside Organics")]
    pub tons_curbside_organics: f64,

    #[serde(rename = "Tons Other Diversion")]
    pub tons_other_diversion: f64,
}

impl DiversionEstimate {
    /// The three predictions in fixed target order.
    pub fn as_array(&self) -> [f64; 3] {
        [
            self.tons_curbside_recycle,
            self.tons_curbside_organics,
            self.tons_other_diversion,
        ]
    }
}

/// Feature/label table for one business group.
#[derive(Debug, Clone)]
pub struct GroupDataset {
    /// Feature matrix (n_samples × 2): employee count, jurisdiction code
    pub features: Array2<f64>,

    /// Label matrix (n_samples × 3), row-aligned with `features`
    pub labels: Array2<f64>,

    /// Number of samples
    pub n_samples: usize,
}

impl GroupDataset {
    /// Assemble the feature and label matrices from a group's records.
    ///
    /// Jurisdictions are encoded with the already-fitted encoder; during
    /// training every record's jurisdiction is in the vocabulary by
    /// construction, but an encoding miss still propagates as an error.
    pub fn from_records(
        records: &[&HistoricalRecord],
        encoder: &JurisdictionEncoder,
    ) -> Result<Self> {
        let n_samples = records.len();
        let mut features = Array2::zeros((n_samples, N_FEATURES));
        let mut labels = Array2::zeros((n_samples, N_TARGETS));

        for (i, record) in records.iter().enumerate() {
            features[[i, 0]] = f64::from(record.employee_count);
            features[[i, 1]] = f64::from(encoder.encode(&record.jurisdiction)?);

            for (j, value) in record.labels().into_iter().enumerate() {
                labels[[i, j]] = value;
            }
        }

        Ok(Self {
            features,
            labels,
            n_samples,
        })
    }

    /// Split rows into training and held-out subsets.
    ///
    /// The partition is a seeded shuffle, so metrics are comparable across
    /// runs. The held-out count is `ceil(test_fraction · n)`, clamped so at
    /// least one row remains for training; with a single row the held-out
    /// subset is empty.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> (GroupDataset, GroupDataset) {
        let n = self.n_samples;
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let mut n_test = ((n as f64) * test_fraction).ceil() as usize;
        if n_test >= n {
            n_test = n.saturating_sub(1);
        }
        let (test_idx, train_idx) = indices.split_at(n_test);

        (self.subset(train_idx), self.subset(test_idx))
    }

    fn subset(&self, indices: &[usize]) -> GroupDataset {
        GroupDataset {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            n_samples: indices.len(),
        }
    }
}

/// Held-out evaluation metrics for one target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub mae: f64,
    pub mse: f64,
    pub r2: f64,
}

/// Held-out evaluation metrics for a fitted group model.
///
/// The top-level figures are uniform averages across the three targets, with
/// a per-target breakdown alongside. R² is never clamped below; a negative
/// value signals a fit worse than predicting the held-out mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error
    pub mae: f64,

    /// Mean squared error
    pub mse: f64,

    /// Coefficient of determination
    pub r2: f64,

    /// Per-target metrics, keyed by label column name
    pub per_target: BTreeMap<String, TargetMetrics>,
}

impl RegressionMetrics {
    /// Compute metrics for row-aligned true/predicted label matrices.
    ///
    /// Both matrices must be non-empty and of shape (n × 3).
    pub fn evaluate(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Self {
        debug_assert_eq!(y_true.shape(), y_pred.shape());
        let n = y_true.nrows() as f64;

        let mut per_target = BTreeMap::new();
        for (t, name) in TARGET_COLUMNS.iter().enumerate() {
            let truth = y_true.column(t);
            let pred = y_pred.column(t);

            let mae = truth
                .iter()
                .zip(pred.iter())
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / n;
            let ss_res = truth
                .iter()
                .zip(pred.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
            let mse = ss_res / n;

            let mean = truth.sum() / n;
            let ss_tot = truth.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>();

            // Zero-variance labels make R² undefined; report 1.0 for a
            // residual-free fit and 0.0 otherwise instead of dividing by zero.
            let r2 = if ss_tot > 0.0 {
                1.0 - ss_res / ss_tot
            } else if ss_res == 0.0 {
                1.0
            } else {
                0.0
            };

            per_target.insert((*name).to_string(), TargetMetrics { mae, mse, r2 });
        }

        let k = per_target.len() as f64;
        let mae = per_target.values().map(|m| m.mae).sum::<f64>() / k;
        let mse = per_target.values().map(|m| m.mse).sum::<f64>() / k;
        let r2 = per_target.values().map(|m| m.r2).sum::<f64>() / k;

        Self {
            mae,
            mse,
            r2,
            per_target,
        }
    }

    pub fn zeroed() -> Self {
        Self {
            mae: 0.0,
            mse: 0.0,
            r2: 0.0,
            per_target: BTreeMap::new(),
        }
    }
}

/// Metadata persisted alongside a fitted group model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Business group this model was trained for
    pub business_group: String,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of held-out samples the metrics were computed on
    pub n_holdout_samples: usize,

    /// Number of input features
    pub n_features: usize,

    /// Held-out evaluation metrics
    pub holdout_metrics: RegressionMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::HistoricalRecord;

    fn record(jurisdiction: &str, employees: u32, labels: [f64; 3]) -> HistoricalRecord {
        HistoricalRecord {
            business_group: "Retail".to_string(),
            jurisdiction: jurisdiction.to_string(),
            employee_count: employees,
            tons_curbside_recycle: labels[0],
            tons_curbside_organics: labels[1],
            tons_other_diversion: labels[2],
        }
    }

    fn sample_dataset(n: usize) -> GroupDataset {
        let records: Vec<HistoricalRecord> = (0..n)
            .map(|i| {
                record(
                    if i % 2 == 0 { "X" } else { "Y" },
                    (i as u32 + 1) * 10,
                    [i as f64, i as f64 * 2.0, i as f64 * 3.0],
                )
            })
            .collect();
        let refs: Vec<&HistoricalRecord> = records.iter().collect();
        let encoder = JurisdictionEncoder::fit(["X", "Y"]);
        GroupDataset::from_records(&refs, &encoder).unwrap()
    }

    #[test]
    fn test_from_records_shapes() {
        let dataset = sample_dataset(10);
        assert_eq!(dataset.features.shape(), &[10, 2]);
        assert_eq!(dataset.labels.shape(), &[10, 3]);
        assert_eq!(dataset.n_samples, 10);
    }

    #[test]
    fn test_split_sizes_and_reproducibility() {
        let dataset = sample_dataset(10);

        let (train_a, test_a) = dataset.train_test_split(0.2, 42);
        assert_eq!(train_a.n_samples, 8);
        assert_eq!(test_a.n_samples, 2);

        let (train_b, test_b) = dataset.train_test_split(0.2, 42);
        assert_eq!(train_a.features, train_b.features);
        assert_eq!(test_a.labels, test_b.labels);
    }

    #[test]
    fn test_split_single_row_keeps_training_row() {
        let dataset = sample_dataset(1);
        let (train, test) = dataset.train_test_split(0.2, 42);

        assert_eq!(train.n_samples, 1);
        assert_eq!(test.n_samples, 0);
    }

    #[test]
    fn test_metrics_perfect_fit() {
        let y = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let metrics = RegressionMetrics::evaluate(&y, &y.clone());

        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.per_target.len(), 3);
    }

    #[test]
    fn test_metrics_allow_negative_r2() {
        let y_true =
            Array2::from_shape_vec((3, 3), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0])
                .unwrap();
        let y_pred = Array2::from_shape_vec((3, 3), vec![10.0; 9]).unwrap();
        let metrics = RegressionMetrics::evaluate(&y_true, &y_pred);

        assert!(metrics.mae >= 0.0);
        assert!(metrics.mse >= 0.0);
        assert!(metrics.r2 < 0.0);
    }

    #[test]
    fn test_metrics_zero_variance_guard() {
        let y_true = Array2::from_shape_vec((2, 3), vec![5.0; 6]).unwrap();
        let exact = RegressionMetrics::evaluate(&y_true, &y_true.clone());
        assert_eq!(exact.r2, 1.0);

        let off = Array2::from_shape_vec((2, 3), vec![6.0; 6]).unwrap();
        let missed = RegressionMetrics::evaluate(&y_true, &off);
        assert_eq!(missed.r2, 0.0);
    }

    #[test]
    fn test_estimate_serializes_with_dataset_column_names() {
        let estimate = DiversionEstimate {
            tons_curbside_recycle: 1.0,
            tons_curbside_organics: 2.0,
            tons_other_diversion: 3.0,
        };
        let json = serde_json::to_value(&estimate).unwrap();

        assert_eq!(json["Tons Curbside Recycle"], 1.0);
        assert_eq!(json["Tons Curbside Organics"], 2.0);
        assert_eq!(json["Tons Other Diversion"], 3.0);
        assert_eq!(json.as_object().unwrap().len(), 3);
    }
}
