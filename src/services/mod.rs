// Service exports
pub mod dataset;
pub mod loader;
pub mod mlflow;
pub mod registrar;

pub use dataset::{DatasetError, DatasetFetcher, DatasetFile, Downloaded};
pub use loader::{LoadError, ModelLoader};
pub use mlflow::{MlflowClient, MlflowError, RegistrationWait};
pub use registrar::{ModelRegistry, Registrar, RegistrarError};
