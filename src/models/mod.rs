// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{IncomeClass, ModelVersion, ModelVersionStatus, RegistrationOutcome, RunInfo};
pub use requests::PredictionInput;
pub use responses::{ErrorResponse, HealthResponse, PredictionResponse, RootResponse};
