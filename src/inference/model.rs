//! Regression Model - artifact loading and prediction
//!
//! The artifact is a JSON document produced by the training pipeline:
//!
//! ```json
//! {
//!   "model_type": "linear_regression",
//!   "feature_names": ["Tahun", "Bulan", "..."],
//!   "coefficients": [0.012, -0.035, "..."],
//!   "intercept": -19.64
//! }
//! ```

use std::path::Path;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LINEAR_REGRESSION: &str = "linear_regression";

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Inference(String),
}

// ============================================================================
// PREDICTOR TRAIT
// ============================================================================

/// Anything that maps rows of features to one numeric output per row.
///
/// Implementations are shared across request handlers and must not mutate
/// themselves while predicting.
pub trait Predictor: Send + Sync {
    /// Number of columns each input row must have
    fn n_features(&self) -> usize;

    /// Short identifier reported on the status endpoint
    fn model_type(&self) -> &str;

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError>;
}

// ============================================================================
// LINEAR REGRESSION
// ============================================================================

/// On-disk representation of a linear regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn default_model_type() -> String {
    LINEAR_REGRESSION.to_string()
}

#[derive(Debug, Clone)]
pub struct LinearRegressionModel {
    coefficients: Array1<f64>,
    intercept: f64,
    feature_names: Option<Vec<String>>,
}

impl LinearRegressionModel {
    #[cfg(test)]
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        Self::from_artifact(ModelArtifact {
            model_type: default_model_type(),
            feature_names: None,
            coefficients,
            intercept,
        })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.model_type != LINEAR_REGRESSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported model type '{}'",
                artifact.model_type
            )));
        }

        if artifact.coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact("no coefficients".to_string()));
        }

        if let Some(i) = artifact.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(ModelError::InvalidArtifact(format!(
                "coefficient {} is not finite",
                i
            )));
        }

        if !artifact.intercept.is_finite() {
            return Err(ModelError::InvalidArtifact("intercept is not finite".to_string()));
        }

        if let Some(names) = &artifact.feature_names {
            if names.len() != artifact.coefficients.len() {
                return Err(ModelError::InvalidArtifact(format!(
                    "{} feature names for {} coefficients",
                    names.len(),
                    artifact.coefficients.len()
                )));
            }
        }

        Ok(Self {
            coefficients: Array1::from(artifact.coefficients),
            intercept: artifact.intercept,
            feature_names: artifact.feature_names,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        Self::from_artifact(artifact)
    }

    /// Load model from a JSON artifact on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        tracing::info!("Loading model from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

impl Predictor for LinearRegressionModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn model_type(&self) -> &str {
        LINEAR_REGRESSION
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
        if rows.ncols() != self.n_features() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.n_features(),
                actual: rows.ncols(),
            });
        }

        let outputs = rows.dot(&self.coefficients) + self.intercept;

        if outputs.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Inference(
                "model produced a non-finite prediction".to_string(),
            ));
        }

        Ok(outputs.to_vec())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_predict_single_row() {
        let model = LinearRegressionModel::new(vec![2.0, 0.5, -1.0], 1.0).unwrap();
        let rows = array![[1.0, 4.0, 3.0]];

        let out = model.predict(rows.view()).unwrap();
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn test_predict_multiple_rows() {
        let model = LinearRegressionModel::new(vec![1.0, 1.0], 0.0).unwrap();
        let rows = array![[1.0, 2.0], [3.0, 4.0]];

        assert_eq!(model.predict(rows.view()).unwrap(), vec![3.0, 7.0]);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = LinearRegressionModel::new(vec![0.3, 0.7], 0.1).unwrap();
        let rows = array![[10.0, 20.0]];

        let first = model.predict(rows.view()).unwrap();
        let second = model.predict(rows.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let model = LinearRegressionModel::new(vec![1.0; 8], 0.0).unwrap();
        let rows = array![[1.0, 2.0, 3.0]];

        let err = model.predict(rows.view()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCountMismatch { expected: 8, actual: 3 }
        ));
        assert_eq!(err.to_string(), "expected 8 features, got 3");
    }

    #[test]
    fn test_predict_overflow_is_an_error() {
        let model = LinearRegressionModel::new(vec![f64::MAX], 0.0).unwrap();
        let rows = array![[10.0]];

        assert!(matches!(
            model.predict(rows.view()),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn test_artifact_validation() {
        assert!(LinearRegressionModel::new(vec![], 0.0).is_err());
        assert!(LinearRegressionModel::new(vec![f64::NAN], 0.0).is_err());
        assert!(LinearRegressionModel::new(vec![1.0], f64::INFINITY).is_err());

        let wrong_type = br#"{"model_type": "random_forest", "coefficients": [1.0], "intercept": 0.0}"#;
        assert!(matches!(
            LinearRegressionModel::from_json(wrong_type),
            Err(ModelError::InvalidArtifact(_))
        ));

        let wrong_names = br#"{"feature_names": ["a"], "coefficients": [1.0, 2.0], "intercept": 0.0}"#;
        assert!(matches!(
            LinearRegressionModel::from_json(wrong_names),
            Err(ModelError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_from_json_defaults_model_type() {
        let json = br#"{"coefficients": [1.5, 2.5], "intercept": 0.5}"#;
        let model = LinearRegressionModel::from_json(json).unwrap();

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.model_type(), LINEAR_REGRESSION);
        assert!(model.feature_names().is_none());
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(matches!(
            LinearRegressionModel::from_json(b"\x80\x04pickle"),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        assert!(matches!(
            LinearRegressionModel::load(&path),
            Err(ModelError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model_type": "linear_regression", "feature_names": ["x", "y"], "coefficients": [1.0, 2.0], "intercept": 3.0}}"#
        )
        .unwrap();

        let model = LinearRegressionModel::load(file.path()).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.feature_names().unwrap().to_vec(), vec!["x", "y"]);
        assert_eq!(model.predict(array![[1.0, 1.0]].view()).unwrap(), vec![6.0]);
    }
}
