//! Tree-ensemble adapter: Implementation of RiskModel over a JSON artifact.
//!
//! The artifact is produced by the training pipeline and holds the trees in
//! node-arena form together with the feature order they were trained on.
//!
//! # Security
//!
//! - An artifact may be bound by a signed manifest (`sign_model` binary)
//! - With `require_signature`, unsigned artifacts are refused
//! - The loaded bytes are the bytes that were hashed; there is no re-read

mod integrity;
mod shap;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{FeatureVector, TreeEnsemble, FEATURE_ORDER};
use crate::ports::{ModelError, RiskModel};

pub use integrity::{
    constant_time_eq, sha256_hex, verify_artifact, verifying_key_from_b64, IntegrityPolicy,
    SignedModelManifest, Verification, MANIFEST_FILE, SIGNATURE_FILE,
};
pub use shap::{tree_shap, TreeExplainer};

#[cfg(test)]
pub(crate) use integrity::signing;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    feature_names: Vec<String>,
    #[serde(flatten)]
    ensemble: TreeEnsemble,
}

/// A validated tree ensemble, read-only after load.
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    ensemble: TreeEnsemble,
    source: Option<PathBuf>,
    verification: Verification,
}

impl TreeEnsembleModel {
    /// Load, verify and validate an artifact from disk.
    ///
    /// # Errors
    /// Returns `ModelError::Unavailable` if the file cannot be read,
    /// `ModelError::Integrity` if signature checks fail, and
    /// `ModelError::InvalidArtifact` / `ModelError::FeatureOrderMismatch`
    /// if the content is unusable.
    pub fn load(path: &Path, policy: &IntegrityPolicy) -> Result<Self, ModelError> {
        let bytes = fs::read(path)
            .map_err(|e| ModelError::Unavailable(format!("{}: {e}", path.display())))?;
        let verification = verify_artifact(path, &bytes, policy)?;
        if verification == Verification::Unsigned {
            tracing::warn!(path = %path.display(), "Loading unsigned model artifact");
        }

        let mut model = Self::from_json(&bytes)?;
        model.source = Some(path.to_path_buf());
        model.verification = verification;

        tracing::info!(
            path = %path.display(),
            objective = ?model.ensemble.objective,
            n_trees = model.ensemble.trees.len(),
            "Loaded model artifact"
        );
        Ok(model)
    }

    /// Parse and validate an artifact held in memory.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidArtifact` or
    /// `ModelError::FeatureOrderMismatch`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::InvalidArtifact(e.to_string()))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported format_version {}",
                artifact.format_version
            )));
        }
        let order_matches = artifact.feature_names.len() == FEATURE_ORDER.len()
            && artifact
                .feature_names
                .iter()
                .zip(FEATURE_ORDER.iter())
                .all(|(found, expected)| found == expected.name());
        if !order_matches {
            return Err(ModelError::FeatureOrderMismatch {
                found: artifact.feature_names,
            });
        }

        Self::from_ensemble(artifact.ensemble)
    }

    /// Wrap an in-memory ensemble after validating it.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidArtifact` on structural problems.
    pub fn from_ensemble(ensemble: TreeEnsemble) -> Result<Self, ModelError> {
        ensemble.validate().map_err(ModelError::InvalidArtifact)?;
        Ok(Self {
            ensemble,
            source: None,
            verification: Verification::Unsigned,
        })
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn verification(&self) -> &Verification {
        &self.verification
    }
}

impl RiskModel for TreeEnsembleModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        let p = self.ensemble.probability(features.as_slice());
        if !p.is_finite() {
            return Err(ModelError::Inference("non-finite probability".into()));
        }
        Ok(vec![1.0 - p, p])
    }

    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        Some(&self.ensemble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures;
    use tempfile::tempdir;

    const BUNDLED_MODEL: &str = include_str!("../../../models/heart_model.json");

    fn names() -> Vec<&'static str> {
        FEATURE_ORDER.iter().map(|f| f.name()).collect()
    }

    fn artifact_with_names(names: &[&str]) -> String {
        serde_json::json!({
            "format_version": 1,
            "objective": "binary_logistic",
            "base_score": 0.0,
            "feature_names": names,
            "trees": [{"nodes": [
                {"type": "split", "feature": 11, "threshold": 0.5, "left": 1, "right": 2},
                {"type": "leaf", "value": -0.5, "cover": 70.0},
                {"type": "leaf", "value": 0.9, "cover": 30.0}
            ]}]
        })
        .to_string()
    }

    #[test]
    fn test_parse_minimal_artifact() {
        let model = TreeEnsembleModel::from_json(artifact_with_names(&names()).as_bytes())
            .expect("Should parse artifact");
        let p = model
            .predict_probability(&fixtures::adverse().to_vector())
            .unwrap();
        assert!((p - crate::domain::sigmoid(0.9)).abs() < 1e-12);

        let proba = model
            .predict_proba(&fixtures::favorable().to_vector())
            .unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_order_mismatch_rejected() {
        let mut swapped = names();
        swapped.swap(0, 1);
        let err = TreeEnsembleModel::from_json(artifact_with_names(&swapped).as_bytes()).unwrap_err();
        assert!(matches!(err, ModelError::FeatureOrderMismatch { .. }));

        let short = &names()[..12];
        assert!(TreeEnsembleModel::from_json(artifact_with_names(short).as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempdir().expect("Should create temp dir");
        let err = TreeEnsembleModel::load(&dir.path().join("absent.json"), &IntegrityPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Unavailable(_)));
    }

    #[test]
    fn test_load_signed_artifact() {
        let dir = tempdir().expect("Should create temp dir");
        let path = dir.path().join("heart_model.json");
        fs::write(&path, artifact_with_names(&names())).unwrap();
        let pub_path = signing::sign_dir(&path);

        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_file: Some(pub_path),
        };
        let model = TreeEnsembleModel::load(&path, &policy).expect("Should load signed model");
        assert_eq!(model.verification(), &Verification::Verified { serial: 3 });
        assert_eq!(model.source(), Some(path.as_path()));
    }

    #[test]
    fn test_bundled_model_separates_profiles() {
        let model = TreeEnsembleModel::from_json(BUNDLED_MODEL.as_bytes())
            .expect("Bundled model should be valid");
        let adverse = model
            .predict_probability(&fixtures::adverse().to_vector())
            .unwrap();
        let favorable = model
            .predict_probability(&fixtures::favorable().to_vector())
            .unwrap();
        assert!(adverse >= 0.6, "adverse profile scored {adverse}");
        assert!(favorable < 0.3, "favorable profile scored {favorable}");
    }
}
