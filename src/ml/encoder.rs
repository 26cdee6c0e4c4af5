use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Jurisdiction label encoder.
///
/// Maps each jurisdiction string seen at fit time to a stable integer code in
/// `0..k-1`, assigned by sorted order of the distinct strings. Fit exactly
/// once on the full historical dataset and persisted; every later prediction
/// reuses the same mapping. A string outside the fit-time vocabulary is
/// rejected rather than re-coded, because re-fitting would silently reassign
/// codes and desynchronize every trained model's feature semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionEncoder {
    /// Vocabulary mapping (jurisdiction -> code)
    codes: BTreeMap<String, u32>,
}

impl JurisdictionEncoder {
    /// Fit the encoder on every jurisdiction value in the dataset.
    ///
    /// Codes are assigned in sorted order of the distinct strings, so the
    /// mapping is independent of row order.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary: std::collections::BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        let codes = vocabulary
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value, code as u32))
            .collect();

        Self { codes }
    }

    /// Return the persisted code for a previously-seen jurisdiction.
    pub fn encode(&self, value: &str) -> Result<u32> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| AppError::UnknownCategory(value.to_string()))
    }

    /// Whether a jurisdiction is in the fit-time vocabulary.
    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    /// Number of distinct jurisdictions in the vocabulary.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The fit-time vocabulary, in code order.
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }
}
