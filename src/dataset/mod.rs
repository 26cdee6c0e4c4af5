//! Historical dataset ingestion.
//!
//! Loads the tabular disposal records the models are trained on. The file is
//! read once per process at startup; a missing column is fatal at load time.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Columns the historical dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Business Group",
    "Jurisdiction(s)",
    "Employee Count",
    "Tons Curbside Recycle",
    "Tons Curbside Organics",
    "Tons Other Diversion",
];

/// One row of the historical disposal dataset. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Commercial sector label, e.g. "Retail"
    #[serde(rename = "Business Group")]
    pub business_group: String,

    /// Free-text jurisdiction, e.g. "Los Angeles (Countywide)"
    #[serde(rename = "Jurisdiction(s)")]
    pub jurisdiction: String,

    /// Number of employees at the business
    #[serde(rename = "Employee Count")]
    pub employee_count: u32,

    #[serde(rename = "Tons Curbside Recycle")]
    pub tons_curbside_recycle: f64,

    #[serde(rename = "Tons Curbside Organics")]
    pub tons_curbside_organics: f64,

    #[serde(rename = "Tons Other Diversion")]
    pub tons_other_diversion: f64,
}

impl HistoricalRecord {
    /// The three label values in fixed target order.
    pub fn labels(&self) -> [f64; 3] {
        [
            self.tons_curbside_recycle,
            self.tons_curbside_organics,
            self.tons_other_diversion,
        ]
    }
}

/// Load all historical records from a CSV file.
///
/// The header row is validated before any row is parsed; a missing required
/// column fails with a `Schema` error naming it. Row-level type failures are
/// also `Schema` errors carrying the 1-based line number.
pub fn load_records(path: &Path) -> Result<Vec<HistoricalRecord>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(AppError::Schema(format!(
                "dataset {} is missing required column '{}'",
                path.display(),
                column
            )));
        }
    }

    let mut records = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        // Line 1 is the header, so data rows start at line 2.
        let record: HistoricalRecord =
            row.map_err(|e| AppError::Schema(format!("line {}: {}", i + 2, e)))?;
        records.push(record);
    }

    info!(
        path = %path.display(),
        n_records = records.len(),
        "historical dataset loaded"
    );

    Ok(records)
}

/// Distinct business groups present in the records, in sorted order.
pub fn business_groups(records: &[HistoricalRecord]) -> Vec<String> {
    let groups: BTreeSet<&str> = records.iter().map(|r| r.business_group.as_str()).collect();
    groups.into_iter().map(String::from).collect()
}
