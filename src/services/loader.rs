use crate::core::{artifact::ARTIFACT_FILE, LoadedModel, ModelArtifact, ModelError};
use crate::services::mlflow::{MlflowClient, MlflowError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while resolving and loading a model at startup
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Registry error: {0}")]
    Registry(#[from] MlflowError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Resolves `models:/<name>@<alias>` through the registry and builds a predictor
pub struct ModelLoader {
    client: Arc<MlflowClient>,
}

impl ModelLoader {
    pub fn new(client: Arc<MlflowClient>) -> Self {
        Self { client }
    }

    pub async fn load(&self, name: &str, alias: &str) -> Result<LoadedModel, LoadError> {
        tracing::info!("Resolving models:/{}@{}", name, alias);

        let version = self.client.get_model_version_by_alias(name, alias).await?;
        let artifact_uri = self
            .client
            .get_model_version_download_uri(name, &version.version)
            .await?;

        tracing::debug!("Version {} artifacts at {}", version.version, artifact_uri);

        let bytes = self.client.fetch_artifact(&artifact_uri, ARTIFACT_FILE).await?;
        let artifact = ModelArtifact::from_slice(&bytes)?;

        Ok(LoadedModel::new(
            name,
            alias,
            version.version,
            version.run_id,
            artifact.into_predictor(),
        ))
    }
}
