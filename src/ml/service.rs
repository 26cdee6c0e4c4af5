use crate::error::Result;
use crate::ml::encoder::JurisdictionEncoder;
use crate::ml::models::DiversionEstimate;
use crate::ml::regressor::DiversionRegressor;
use crate::store::ArtifactStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Load-only prediction service.
///
/// Opens the persisted encoder once and loads each group's model on first
/// use. Everything here is read-only: training is a separate, strictly
/// earlier phase, so concurrent predictions need no coordination beyond the
/// model cache. The encoder is never re-fit at prediction time — an unseen
/// jurisdiction is a terminal, typed failure for that request.
#[derive(Debug)]
pub struct PredictionService {
    store: ArtifactStore,
    encoder: JurisdictionEncoder,
    models: RwLock<HashMap<String, Arc<DiversionRegressor>>>,
}

impl PredictionService {
    /// Open the service against a trained artifact store.
    ///
    /// Fails with `ArtifactMissing` when the encoder blob is absent or
    /// corrupt; a store that was never trained cannot serve predictions.
    pub fn open(store: ArtifactStore) -> Result<Self> {
        let encoder = store.load_encoder()?;
        info!(
            n_jurisdictions = encoder.len(),
            artifacts = %store.root().display(),
            "prediction service opened"
        );

        Ok(Self {
            store,
            encoder,
            models: RwLock::new(HashMap::new()),
        })
    }

    /// Predict the three diversion tonnages for a single business.
    ///
    /// Fails with `UnknownBusinessGroup` when no model was trained for the
    /// group, and `UnknownCategory` when the jurisdiction was not in the
    /// fit-time vocabulary. No retries; failures are terminal per request.
    pub fn predict(
        &self,
        business_group: &str,
        jurisdiction: &str,
        employee_count: u32,
    ) -> Result<DiversionEstimate> {
        let model = self.model_for(business_group)?;
        let code = self.encoder.encode(jurisdiction)?;

        let estimate = model.predict_one(f64::from(employee_count), f64::from(code))?;
        debug!(
            business_group,
            jurisdiction, employee_count, "prediction served"
        );
        Ok(estimate)
    }

    /// The persisted encoder backing this service.
    pub fn encoder(&self) -> &JurisdictionEncoder {
        &self.encoder
    }

    fn model_for(&self, business_group: &str) -> Result<Arc<DiversionRegressor>> {
        if let Some(model) = self
            .models
            .read()
            .expect("model cache lock poisoned")
            .get(business_group)
        {
            return Ok(model.clone());
        }

        let model = Arc::new(self.store.load_model(business_group)?);
        self.models
            .write()
            .expect("model cache lock poisoned")
            .insert(business_group.to_string(), model.clone());
        debug!(business_group, "model loaded into cache");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::dataset::HistoricalRecord;
    use crate::error::AppError;
    use crate::ml::pipeline::TrainingPipeline;

    fn record(jurisdiction: &str, employees: u32) -> HistoricalRecord {
        let e = f64::from(employees);
        HistoricalRecord {
            business_group: "Retail".to_string(),
            jurisdiction: jurisdiction.to_string(),
            employee_count: employees,
            tons_curbside_recycle: 0.4 * e,
            tons_curbside_organics: 0.2 * e,
            tons_other_diversion: 0.1 * e,
        }
    }

    fn trained_store(dir: &std::path::Path) -> ArtifactStore {
        let store = ArtifactStore::new(dir);
        let records: Vec<HistoricalRecord> = (0..10u32)
            .map(|i| record(if i % 2 == 0 { "X" } else { "Y" }, (i + 1) * 10))
            .collect();
        TrainingPipeline::new(store.clone(), &TrainingConfig::default())
            .unwrap()
            .train_all(&records)
            .unwrap();
        store
    }

    #[test]
    fn test_open_without_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PredictionService::open(ArtifactStore::new(dir.path())).unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing(_)));
    }

    #[test]
    fn test_predict_known_group_and_jurisdiction() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::open(trained_store(dir.path())).unwrap();

        let estimate = service.predict("Retail", "X", 25).unwrap();
        assert!(estimate.tons_curbside_recycle.is_finite());
        assert!(estimate.tons_curbside_organics.is_finite());
        assert!(estimate.tons_other_diversion.is_finite());
    }

    #[test]
    fn test_unknown_group_is_rejected_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::open(trained_store(dir.path())).unwrap();

        // The jurisdiction is also unknown here; the group lookup fails first.
        let err = service.predict("NoSuchGroup", "Atlantis", 10).unwrap_err();
        assert!(matches!(err, AppError::UnknownBusinessGroup(_)));
    }

    #[test]
    fn test_unknown_jurisdiction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::open(trained_store(dir.path())).unwrap();

        let err = service.predict("Retail", "Atlantis", 10).unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));
    }

    #[test]
    fn test_model_cache_serves_repeat_requests() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::open(trained_store(dir.path())).unwrap();

        let first = service.predict("Retail", "X", 25).unwrap();
        let second = service.predict("Retail", "X", 25).unwrap();
        assert_eq!(first, second);
    }
}
