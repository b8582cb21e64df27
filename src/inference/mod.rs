//! Inference Module - regression model serving
//!
//! Keeps model loading and feature normalization out of the HTTP handlers.

pub mod features;
pub mod model;
pub mod service;

// Re-export common types
pub use features::NormalizeError;
pub use service::{ModelMetadata, ModelService, ServiceError};
