//! Durable artifact storage.
//!
//! One shared encoder blob plus one model blob per business group, all
//! bincode. Group names contain punctuation and spaces and are untrusted, so
//! they are sanitized into storage keys before touching the filesystem.

use crate::error::{AppError, Result};
use crate::ml::encoder::JurisdictionEncoder;
use crate::ml::regressor::DiversionRegressor;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENCODER_FILE: &str = "encoder.bin";
const MODELS_DIR: &str = "models";
const MODEL_EXT: &str = "bin";

/// Filesystem-backed store for the fitted encoder and per-group models.
///
/// Read-only after training completes; training and prediction are mutually
/// exclusive phases, so loads need no coordination.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the store directories if absent.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(MODELS_DIR))?;
        Ok(())
    }

    /// Derive a stable storage key from a business-group name.
    ///
    /// Lowercased alphanumeric runs joined by single dashes; everything else
    /// is collapsed, so names with separators or punctuation cannot escape
    /// the models directory.
    pub fn sanitize_key(group: &str) -> String {
        let mut key = String::with_capacity(group.len());
        let mut pending_dash = false;

        for c in group.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !key.is_empty() {
                    key.push('-');
                }
                pending_dash = false;
                key.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }

        if key.is_empty() {
            "group".to_string()
        } else {
            key
        }
    }

    fn encoder_path(&self) -> PathBuf {
        self.root.join(ENCODER_FILE)
    }

    fn model_path(&self, group: &str) -> PathBuf {
        self.root
            .join(MODELS_DIR)
            .join(format!("{}.{}", Self::sanitize_key(group), MODEL_EXT))
    }

    /// Persist the fitted encoder. Written once at fit time.
    pub fn save_encoder(&self, encoder: &JurisdictionEncoder) -> Result<()> {
        self.ensure_layout()?;
        let bytes = bincode::serialize(encoder)?;
        fs::write(self.encoder_path(), bytes)?;
        debug!(path = %self.encoder_path().display(), "encoder persisted");
        Ok(())
    }

    /// Load the persisted encoder. Absent or undecodable blobs are
    /// `ArtifactMissing`; predictions must never re-fit instead.
    pub fn load_encoder(&self) -> Result<JurisdictionEncoder> {
        let path = self.encoder_path();
        if !path.exists() {
            return Err(AppError::ArtifactMissing(format!(
                "encoder artifact not found at {}",
                path.display()
            )));
        }
        let bytes = fs::read(&path)?;
        bincode::deserialize(&bytes).map_err(|e| {
            AppError::ArtifactMissing(format!(
                "encoder artifact at {} is corrupt: {}",
                path.display(),
                e
            ))
        })
    }

    /// Persist a fitted model keyed by its business group.
    pub fn save_model(&self, group: &str, model: &DiversionRegressor) -> Result<()> {
        self.ensure_layout()?;
        let path = self.model_path(group);
        let bytes = bincode::serialize(model)?;
        fs::write(&path, bytes)?;
        debug!(group, path = %path.display(), "model persisted");
        Ok(())
    }

    /// Load the persisted model for a business group.
    ///
    /// An absent blob means no model was ever trained for the group
    /// (`UnknownBusinessGroup`); a present but undecodable blob is
    /// `ArtifactMissing`.
    pub fn load_model(&self, group: &str) -> Result<DiversionRegressor> {
        let path = self.model_path(group);
        if !path.exists() {
            return Err(AppError::UnknownBusinessGroup(group.to_string()));
        }
        let bytes = fs::read(&path)?;
        bincode::deserialize(&bytes).map_err(|e| {
            AppError::ArtifactMissing(format!(
                "model artifact at {} is corrupt: {}",
                path.display(),
                e
            ))
        })
    }

    /// Storage keys of every persisted model.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let dir = self.root.join(MODELS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(MODEL_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(
            ArtifactStore::sanitize_key("Services - Professional, Technical, & Financial"),
            "services-professional-technical-financial"
        );
        assert_eq!(ArtifactStore::sanitize_key("Retail"), "retail");
        assert_eq!(ArtifactStore::sanitize_key("../etc/passwd"), "etc-passwd");
        assert_eq!(ArtifactStore::sanitize_key("///"), "group");
    }

    #[test]
    fn test_encoder_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let encoder = JurisdictionEncoder::fit(["Pasadena", "Burbank"]);
        store.save_encoder(&encoder).unwrap();

        let restored = store.load_encoder().unwrap();
        assert_eq!(encoder, restored);
    }

    #[test]
    fn test_missing_encoder_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store.load_encoder().unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing(_)));
    }

    #[test]
    fn test_corrupt_encoder_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();
        fs::write(dir.path().join(ENCODER_FILE), b"not bincode").unwrap();

        let err = store.load_encoder().unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing(_)));
    }

    #[test]
    fn test_missing_model_is_unknown_business_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();

        let err = store.load_model("NoSuchGroup").unwrap_err();
        assert!(matches!(err, AppError::UnknownBusinessGroup(ref g) if g == "NoSuchGroup"));
    }

    #[test]
    fn test_list_models_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(store.list_models().unwrap().is_empty());
    }
}
