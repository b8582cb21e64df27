//! Feature Layout - request payload to model input row
//!
//! **The model reads columns by position, not by name.**
//! `FEATURE_LAYOUT` is the single source of truth for the column order of
//! named-field payloads. Reordering it silently breaks every prediction.

use ndarray::{Array1, Array2, Axis};
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::ModelError;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Named fields in the exact order the model expects them
pub const FEATURE_LAYOUT: &[&str] = &[
    "Tahun",          // 0: year
    "Bulan",          // 1: month
    "Luas_Lahan",     // 2: land area
    "Luas_Panen_ha",  // 3: harvested area (ha)
    "Curah_Hujan_mm", // 4: rainfall (mm)
    "Suhu_Tanah",     // 5: soil temperature
    "Kelembapan",     // 6: humidity
    "pH",             // 7: soil pH
];

/// Total number of named features
pub const FEATURE_COUNT: usize = 8;

/// Key of the pre-built numeric array payload shape
pub const FEATURES_KEY: &str = "features";

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Check that a model's declared column names match `FEATURE_LAYOUT` exactly.
///
/// Named-field payloads are always assembled in layout order, so a model
/// trained on any other order would receive misaligned columns.
pub fn validate_layout(names: &[String]) -> Result<(), ModelError> {
    if names.len() != FEATURE_COUNT {
        return Err(ModelError::InvalidArtifact(format!(
            "feature_names has {} entries, request layout has {}",
            names.len(),
            FEATURE_COUNT
        )));
    }

    for (column, name) in names.iter().enumerate() {
        match feature_index(name) {
            Some(i) if i == column => {}
            Some(i) => {
                return Err(ModelError::InvalidArtifact(format!(
                    "feature_names do not match request layout: '{}' at column {}, expected column {}",
                    name, column, i
                )));
            }
            None => {
                return Err(ModelError::InvalidArtifact(format!(
                    "feature_names do not match request layout: unknown feature '{}'",
                    name
                )));
            }
        }
    }

    Ok(())
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("{0}")]
    InvalidPayload(String),

    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Field(s) must be numeric: {}", .0.join(", "))]
    NonNumericFields(Vec<&'static str>),
}

// ============================================================================
// FEATURE ROW
// ============================================================================

/// A single input row, in model column order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Build the `1 x n_features` matrix handed to a predictor.
    ///
    /// Fails unless the row has exactly `n_features` values.
    pub fn to_matrix(&self, n_features: usize) -> Result<Array2<f64>, ModelError> {
        if self.values.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                actual: self.values.len(),
            });
        }

        Ok(Array1::from(self.values.clone()).insert_axis(Axis(0)))
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Parse a raw request body into a feature row
pub fn normalize(body: &[u8]) -> Result<FeatureRow, NormalizeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(NormalizeError::InvalidPayload(
            "Request body is empty".to_string(),
        ));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| NormalizeError::InvalidPayload(format!("Invalid JSON: {}", e)))?;

    normalize_value(&value)
}

/// Convert a parsed JSON payload into a feature row.
///
/// A `"features"` array takes precedence; otherwise every name in
/// `FEATURE_LAYOUT` must be present with a numeric value.
pub fn normalize_value(value: &Value) -> Result<FeatureRow, NormalizeError> {
    let object = value.as_object().ok_or_else(|| {
        NormalizeError::InvalidPayload("Request body must be a JSON object".to_string())
    })?;

    match object.get(FEATURES_KEY) {
        Some(features) => from_feature_array(features),
        None => from_named_fields(object),
    }
}

fn from_feature_array(features: &Value) -> Result<FeatureRow, NormalizeError> {
    let items = features.as_array().ok_or_else(|| {
        NormalizeError::InvalidPayload("features must be an array of numbers".to_string())
    })?;

    let mut values = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let v = item.as_f64().ok_or_else(|| {
            NormalizeError::InvalidPayload(format!("features[{}] is not a number", i))
        })?;
        values.push(v);
    }

    Ok(FeatureRow::from_values(values))
}

fn from_named_fields(object: &Map<String, Value>) -> Result<FeatureRow, NormalizeError> {
    let mut values = Vec::with_capacity(FEATURE_COUNT);
    let mut missing = Vec::new();
    let mut non_numeric = Vec::new();

    for &name in FEATURE_LAYOUT {
        match object.get(name) {
            None => missing.push(name),
            Some(v) => match v.as_f64() {
                Some(n) => values.push(n),
                None => non_numeric.push(name),
            },
        }
    }

    if !missing.is_empty() {
        return Err(NormalizeError::MissingFields(missing));
    }
    if !non_numeric.is_empty() {
        return Err(NormalizeError::NonNumericFields(non_numeric));
    }

    Ok(FeatureRow::from_values(values))
}

// ============================================================================
// TESTS
// ============================================================================
