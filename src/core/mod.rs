// Core model exports
pub mod artifact;
pub mod frame;
pub mod state;

pub use artifact::{CategoricalFeature, LogisticRegression, ModelArtifact, NumericFeature};
pub use frame::{Cell, FeatureFrame};
pub use state::{LoadedModel, ModelState};

use thiserror::Error;

/// Errors raised while preparing or running a prediction
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Input coercion failed: {0}")]
    Coercion(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A trained model treated as a black box
///
/// Returns one raw class value per frame row. Implementations must be safe to
/// call concurrently; the service shares a single instance across workers.
pub trait Predictor: Send + Sync {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<i64>, ModelError>;

    fn flavor(&self) -> &'static str;
}
