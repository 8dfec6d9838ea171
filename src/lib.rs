//! Adult Income - dataset fetcher, MLflow model registrar and prediction API
//!
//! The model itself lives in an MLflow registry. This crate downloads the raw
//! dataset, registers a trained run's model under a name and alias, and serves
//! the aliased version over HTTP with Prometheus metrics.

pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{FeatureFrame, LoadedModel, ModelArtifact, ModelState, Predictor};
pub use metrics::Metrics;
pub use models::{IncomeClass, PredictionInput, PredictionResponse};
pub use services::{MlflowClient, ModelLoader, Registrar};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let frame = FeatureFrame::from_input(&PredictionInput::example());
        assert_eq!(frame.len(), 1);
        assert_eq!(IncomeClass::from_prediction(1).label(), ">50K");
    }
}
