//! Model Service - the loaded model handle shared by all handlers
//!
//! Built once at startup and never mutated afterwards, so request handlers
//! read it concurrently without locking. A missing model is a normal state:
//! the service keeps the load diagnostic and reports itself as unavailable.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::features::{self, FeatureRow, NormalizeError};
use super::model::{LinearRegressionModel, ModelError, Predictor};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Prediction failed: {0}")]
    PredictionFailed(#[from] ModelError),
}

/// Model metadata reported on the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub model_type: String,
    pub n_features: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ModelService {
    predictor: Option<Arc<dyn Predictor>>,
    metadata: Option<ModelMetadata>,
    load_error: Option<String>,
}

impl ModelService {
    /// Load the model artifact at `path`.
    ///
    /// Never fails: a missing or corrupt artifact yields an unavailable service.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match load_checked(path) {
            Ok(model) => {
                let service = Self::new(Arc::new(model), path.display().to_string());
                tracing::info!(
                    "Model loaded ({} features)",
                    service.metadata.as_ref().map_or(0, |m| m.n_features)
                );
                service
            }
            Err(e) => {
                tracing::error!("Failed to load model from {}: {}", path.display(), e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn new(predictor: Arc<dyn Predictor>, model_path: impl Into<String>) -> Self {
        let metadata = ModelMetadata {
            model_path: model_path.into(),
            model_type: predictor.model_type().to_string(),
            n_features: predictor.n_features(),
            loaded_at: Utc::now(),
        };

        Self {
            predictor: Some(predictor),
            metadata: Some(metadata),
            load_error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            predictor: None,
            metadata: None,
            load_error: Some(reason.into()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    /// Why the model is unavailable, if it is
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Normalize a raw request body and run it through the model
    pub fn predict(&self, body: &[u8]) -> Result<Vec<f64>, ServiceError> {
        let predictor = self.predictor.as_ref().ok_or(ServiceError::ModelUnavailable)?;
        let row = features::normalize(body)?;
        Ok(invoke(predictor.as_ref(), &row)?)
    }
}

/// Load an artifact and reject it if its declared columns disagree with the request layout
fn load_checked(path: &Path) -> Result<LinearRegressionModel, ModelError> {
    let model = LinearRegressionModel::load(path)?;
    if let Some(names) = model.feature_names() {
        features::validate_layout(names)?;
    }
    Ok(model)
}

/// Run a single row through the predictor, turning panics into errors
fn invoke(predictor: &dyn Predictor, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
    let matrix = row.to_matrix(predictor.n_features())?;

    let outputs = panic::catch_unwind(AssertUnwindSafe(|| predictor.predict(matrix.view())))
        .map_err(|_| ModelError::Inference("model panicked during prediction".to_string()))??;

    if outputs.len() != matrix.nrows() {
        return Err(ModelError::Inference(format!(
            "model returned {} outputs for {} rows",
            outputs.len(),
            matrix.nrows()
        )));
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;
    use std::io::Write;

    struct PanickingPredictor;

    impl Predictor for PanickingPredictor {
        fn n_features(&self) -> usize {
            1
        }

        fn model_type(&self) -> &str {
            "panicking"
        }

        fn predict(&self, _rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
            panic!("boom")
        }
    }

    struct EmptyPredictor;

    impl Predictor for EmptyPredictor {
        fn n_features(&self) -> usize {
            1
        }

        fn model_type(&self) -> &str {
            "empty"
        }

        fn predict(&self, _rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
            Ok(Vec::new())
        }
    }

    fn linear_service() -> ModelService {
        let model = LinearRegressionModel::new(vec![1.0; 8], 0.5).unwrap();
        ModelService::new(Arc::new(model), "memory")
    }

    #[test]
    fn test_load_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let service = ModelService::load(dir.path().join("model_regresi_padi.json"));

        assert!(!service.is_loaded());
        assert!(service.metadata().is_none());
        assert!(service.load_error().unwrap().contains("Model not found"));
    }

    #[test]
    fn test_load_corrupt_artifact_is_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"coefficients\": ").unwrap();

        let service = ModelService::load(file.path());
        assert!(!service.is_loaded());
        assert!(service.load_error().unwrap().contains("parse"));
    }

    #[test]
    fn test_load_valid_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"coefficients": [1, 1, 1, 1, 1, 1, 1, 1], "intercept": 0}"#)
            .unwrap();

        let service = ModelService::load(file.path());
        assert!(service.is_loaded());
        assert!(service.load_error().is_none());

        let metadata = service.metadata().unwrap();
        assert_eq!(metadata.n_features, 8);
        assert_eq!(metadata.model_type, "linear_regression");
    }

    #[test]
    fn test_load_reordered_feature_names_is_unavailable() {
        // Column 0 is declared as pH, so a served model would read Tahun as pH
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"feature_names": ["pH", "Kelembapan", "Suhu_Tanah", "Curah_Hujan_mm",
                "Luas_Panen_ha", "Luas_Lahan", "Bulan", "Tahun"],
                "coefficients": [1, 0, 0, 0, 0, 0, 0, 0], "intercept": 0}"#,
        )
        .unwrap();

        let service = ModelService::load(file.path());
        assert!(!service.is_loaded());
        assert!(service
            .load_error()
            .unwrap()
            .contains("feature_names do not match request layout"));
        assert!(matches!(
            service.predict(br#"{"Tahun": 2023, "Bulan": 5, "Luas_Lahan": 1.2, "Luas_Panen_ha": 1.1,
                "Curah_Hujan_mm": 150.0, "Suhu_Tanah": 27.5, "Kelembapan": 80.0, "pH": 6.5}"#),
            Err(ServiceError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_load_layout_feature_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"feature_names": ["Tahun", "Bulan", "Luas_Lahan", "Luas_Panen_ha",
                "Curah_Hujan_mm", "Suhu_Tanah", "Kelembapan", "pH"],
                "coefficients": [0, 0, 0, 0, 0, 0, 0, 1], "intercept": 0}"#,
        )
        .unwrap();

        let service = ModelService::load(file.path());
        assert!(service.is_loaded());

        let body = br#"{"Tahun": 2023, "Bulan": 5, "Luas_Lahan": 1.2, "Luas_Panen_ha": 1.1,
            "Curah_Hujan_mm": 150.0, "Suhu_Tanah": 27.5, "Kelembapan": 80.0, "pH": 6.5}"#;
        assert_eq!(service.predict(body).unwrap(), vec![6.5]);
    }

    #[test]
    fn test_unavailable_skips_normalization() {
        let service = ModelService::unavailable("gone");
        assert!(matches!(
            service.predict(b"not json"),
            Err(ServiceError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_predict_named_fields() {
        let body = br#"{"Tahun": 1, "Bulan": 2, "Luas_Lahan": 3, "Luas_Panen_ha": 4,
            "Curah_Hujan_mm": 5, "Suhu_Tanah": 6, "Kelembapan": 7, "pH": 8}"#;

        assert_eq!(linear_service().predict(body).unwrap(), vec![36.5]);
    }

    #[test]
    fn test_predict_normalize_error_passes_through() {
        assert!(matches!(
            linear_service().predict(b"{}"),
            Err(ServiceError::Normalize(NormalizeError::MissingFields(_)))
        ));
    }

    #[test]
    fn test_predict_wrong_feature_count() {
        let err = linear_service().predict(br#"{"features": [1, 2, 3]}"#).unwrap_err();

        assert!(matches!(err, ServiceError::PredictionFailed(_)));
        assert_eq!(err.to_string(), "Prediction failed: expected 8 features, got 3");
    }

    #[test]
    fn test_predictor_panic_is_contained() {
        let service = ModelService::new(Arc::new(PanickingPredictor), "memory");
        let err = service.predict(br#"{"features": [1]}"#).unwrap_err();

        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_predictor_output_count_checked() {
        let service = ModelService::new(Arc::new(EmptyPredictor), "memory");
        assert!(matches!(
            service.predict(br#"{"features": [1]}"#),
            Err(ServiceError::PredictionFailed(ModelError::Inference(_)))
        ));
    }
}
