use crate::models::{ModelVersion, RegistrationOutcome};
use crate::services::mlflow::{MlflowClient, MlflowError};
use async_trait::async_trait;
use thiserror::Error;

/// The three registry mutations the registrar performs
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn register(&self, model_uri: &str, name: &str) -> Result<ModelVersion, MlflowError>;

    async fn transition(&self, name: &str, version: &str, stage: &str) -> Result<ModelVersion, MlflowError>;

    async fn set_alias(&self, name: &str, alias: &str, version: &str) -> Result<(), MlflowError>;
}

#[async_trait]
impl ModelRegistry for MlflowClient {
    async fn register(&self, model_uri: &str, name: &str) -> Result<ModelVersion, MlflowError> {
        self.register_model(model_uri, name).await
    }

    async fn transition(&self, name: &str, version: &str, stage: &str) -> Result<ModelVersion, MlflowError> {
        self.transition_model_version_stage(name, version, stage).await
    }

    async fn set_alias(&self, name: &str, alias: &str, version: &str) -> Result<(), MlflowError> {
        self.set_registered_model_alias(name, alias, version).await
    }
}

/// Failure of one registrar step
///
/// Earlier steps are not undone; `version` names what was left in the registry.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("Failed to register model '{name}': {source}")]
    Register {
        name: String,
        #[source]
        source: MlflowError,
    },

    #[error("Registered {name} version {version} but stage transition to {stage} failed: {source}")]
    Transition {
        name: String,
        version: String,
        stage: String,
        #[source]
        source: MlflowError,
    },

    #[error("Registered {name} version {version} but setting alias '{alias}' failed: {source}")]
    SetAlias {
        name: String,
        version: String,
        alias: String,
        #[source]
        source: MlflowError,
    },
}

/// Registers a run's model, moves it to a stage and points an alias at it
pub struct Registrar<R> {
    registry: R,
    stage: String,
    alias: String,
}

impl<R: ModelRegistry> Registrar<R> {
    pub fn new(registry: R, stage: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            registry,
            stage: stage.into(),
            alias: alias.into(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Run register -> transition -> set_alias, stopping at the first failure
    pub async fn run(&self, run_id: &str, name: &str) -> Result<RegistrationOutcome, RegistrarError> {
        let model_uri = format!("runs:/{}/model", run_id);
        tracing::info!("Registering model '{}' from run: {}", name, run_id);

        let registered = self
            .registry
            .register(&model_uri, name)
            .await
            .map_err(|source| RegistrarError::Register {
                name: name.to_string(),
                source,
            })?;
        let version = registered.version;
        tracing::info!("Model registered with version: {}", version);

        self.registry
            .transition(name, &version, &self.stage)
            .await
            .map_err(|source| RegistrarError::Transition {
                name: name.to_string(),
                version: version.clone(),
                stage: self.stage.clone(),
                source,
            })?;
        tracing::info!("Model version {} transitioned to {}", version, self.stage);

        self.registry
            .set_alias(name, &self.alias, &version)
            .await
            .map_err(|source| RegistrarError::SetAlias {
                name: name.to_string(),
                version: version.clone(),
                alias: self.alias.clone(),
                source,
            })?;
        tracing::info!("Model alias '{}' set to version {}", self.alias, version);

        Ok(RegistrationOutcome {
            name: name.to_string(),
            version,
            stage: self.stage.clone(),
            alias: self.alias.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
        fail_transition: bool,
    }

    #[async_trait]
    impl ModelRegistry for Recording {
        async fn register(&self, model_uri: &str, name: &str) -> Result<ModelVersion, MlflowError> {
            self.calls.lock().unwrap().push(format!("register({}, {})", model_uri, name));
            Ok(serde_json::from_value(serde_json::json!({ "name": name, "version": "7" })).unwrap())
        }

        async fn transition(&self, name: &str, version: &str, stage: &str) -> Result<ModelVersion, MlflowError> {
            self.calls.lock().unwrap().push(format!("transition({}, {}, {})", name, version, stage));
            if self.fail_transition {
                return Err(MlflowError::InvalidResponse("boom".into()));
            }
            Ok(serde_json::from_value(serde_json::json!({ "name": name, "version": version })).unwrap())
        }

        async fn set_alias(&self, name: &str, alias: &str, version: &str) -> Result<(), MlflowError> {
            self.calls.lock().unwrap().push(format!("set_alias({}, {}, {})", name, alias, version));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_call_sequence() {
        let registrar = Registrar::new(Recording::default(), "Staging", "champion");
        let outcome = registrar.run("abc123", "adult-income").await.unwrap();

        assert_eq!(outcome.version, "7");
        assert_eq!(
            *registrar.registry().calls.lock().unwrap(),
            vec![
                "register(runs:/abc123/model, adult-income)",
                "transition(adult-income, 7, Staging)",
                "set_alias(adult-income, champion, 7)",
            ]
        );
    }

    #[tokio::test]
    async fn test_transition_failure_stops_sequence() {
        let registry = Recording {
            fail_transition: true,
            ..Default::default()
        };
        let registrar = Registrar::new(registry, "Staging", "champion");

        let err = registrar.run("abc123", "adult-income").await.unwrap_err();
        match err {
            RegistrarError::Transition { version, .. } => assert_eq!(version, "7"),
            other => panic!("unexpected error: {}", other),
        }
        // Alias step never ran
        assert_eq!(registrar.registry().calls.lock().unwrap().len(), 2);
    }
}
