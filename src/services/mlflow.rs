use crate::models::{ModelVersion, ModelVersionStatus, RunInfo};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur when interacting with the MLflow tracking server
#[derive(Debug, Error)]
pub enum MlflowError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {error_code}: {message}")]
    ApiError {
        status: u16,
        error_code: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unsupported artifact URI: {0}")]
    UnsupportedArtifactUri(String),

    #[error("Failed to read artifact {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model version {name}/{version} failed registration: {message}")]
    RegistrationFailed {
        name: String,
        version: String,
        message: String,
    },

    #[error("Model version {name}/{version} not ready after {waited_secs}s")]
    RegistrationTimeout {
        name: String,
        version: String,
        waited_secs: u64,
    },
}

impl MlflowError {
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MlflowError::ApiError { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelVersionEnvelope {
    model_version: ModelVersion,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    run: RunBody,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct DownloadUriBody {
    artifact_uri: String,
}

/// How long `register_model` waits for a new version to become READY
#[derive(Debug, Clone, Copy)]
pub struct RegistrationWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RegistrationWait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// MLflow REST API client
///
/// Covers the tracking and model registry calls used here:
/// - Resolving runs and their artifact locations
/// - Registering model versions, stage transitions and aliases
/// - Resolving an alias and downloading model artifacts
pub struct MlflowClient {
    base_url: String,
    client: Client,
    wait: RegistrationWait,
}

impl MlflowClient {
    /// Create a new MLflow client
    pub fn new(tracking_uri: impl Into<String>, timeout: Duration) -> Result<Self, MlflowError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: tracking_uri.into().trim_end_matches('/').to_string(),
            client,
            wait: RegistrationWait::default(),
        })
    }

    pub fn with_registration_wait(mut self, wait: RegistrationWait) -> Self {
        self.wait = wait;
        self
    }

    pub fn tracking_uri(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MlflowError> {
        let url = self.api_url(endpoint);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, MlflowError> {
        let url = self.api_url(endpoint);
        tracing::debug!("POST {}", url);

        let response = self.client.post(&url).json(&body).send().await?;
        decode(response).await
    }

    /// Fetch run metadata
    pub async fn get_run(&self, run_id: &str) -> Result<RunInfo, MlflowError> {
        let envelope: RunEnvelope = self
            .get("runs/get", &[("run_id", run_id)])
            .await
            .map_err(|e| not_found_as(e, format!("Run {}", run_id)))?;
        Ok(envelope.run.info)
    }

    /// Create a registered model; an existing one with the same name is accepted
    pub async fn create_registered_model(&self, name: &str) -> Result<(), MlflowError> {
        match self
            .post::<Value>("registered-models/create", json!({ "name": name }))
            .await
        {
            Ok(_) => {
                tracing::info!("Created registered model '{}'", name);
                Ok(())
            }
            Err(e) if e.error_code() == Some("RESOURCE_ALREADY_EXISTS") => {
                tracing::info!("Registered model '{}' already exists, creating a new version", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: Option<&str>,
    ) -> Result<ModelVersion, MlflowError> {
        let mut body = json!({ "name": name, "source": source });
        if let Some(run_id) = run_id {
            body["run_id"] = Value::String(run_id.to_string());
        }

        let envelope: ModelVersionEnvelope = self.post("model-versions/create", body).await?;
        Ok(envelope.model_version)
    }

    pub async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion, MlflowError> {
        let envelope: ModelVersionEnvelope = self
            .get("model-versions/get", &[("name", name), ("version", version)])
            .await
            .map_err(|e| not_found_as(e, format!("Model version {}/{}", name, version)))?;
        Ok(envelope.model_version)
    }

    /// Register `model_uri` under `name` and wait until the new version is READY
    ///
    /// `runs:/<run_id>/<path>` URIs are resolved against the run's artifact root.
    pub async fn register_model(&self, model_uri: &str, name: &str) -> Result<ModelVersion, MlflowError> {
        let (source, run_id) = match parse_runs_uri(model_uri) {
            Some((run_id, path)) => {
                let run = self.get_run(run_id).await?;
                let root = run.artifact_uri.trim_end_matches('/');
                let source = if path.is_empty() {
                    root.to_string()
                } else {
                    format!("{}/{}", root, path)
                };
                (source, Some(run_id.to_string()))
            }
            None => (model_uri.to_string(), None),
        };

        self.create_registered_model(name).await?;
        let version = self
            .create_model_version(name, &source, run_id.as_deref())
            .await?;

        tracing::info!("Created version {} of '{}' from {}", version.version, name, source);

        self.await_ready(version).await
    }

    async fn await_ready(&self, mut version: ModelVersion) -> Result<ModelVersion, MlflowError> {
        let started = Instant::now();

        loop {
            let status = version.status;
            match status {
                Some(ModelVersionStatus::FailedRegistration) => {
                    return Err(MlflowError::RegistrationFailed {
                        name: version.name,
                        version: version.version,
                        message: version.status_message.unwrap_or_default(),
                    });
                }
                _ if version.is_ready() => return Ok(version),
                _ => {}
            }

            if started.elapsed() >= self.wait.timeout {
                return Err(MlflowError::RegistrationTimeout {
                    name: version.name,
                    version: version.version,
                    waited_secs: self.wait.timeout.as_secs(),
                });
            }

            tracing::debug!("Waiting for {}/{} to become READY", version.name, version.version);
            tokio::time::sleep(self.wait.poll_interval).await;
            version = self.get_model_version(&version.name, &version.version).await?;
        }
    }

    pub async fn transition_model_version_stage(
        &self,
        name: &str,
        version: &str,
        stage: &str,
    ) -> Result<ModelVersion, MlflowError> {
        let envelope: ModelVersionEnvelope = self
            .post(
                "model-versions/transition-stage",
                json!({
                    "name": name,
                    "version": version,
                    "stage": stage,
                    "archive_existing_versions": false,
                }),
            )
            .await?;
        Ok(envelope.model_version)
    }

    pub async fn set_registered_model_alias(
        &self,
        name: &str,
        alias: &str,
        version: &str,
    ) -> Result<(), MlflowError> {
        self.post::<Value>(
            "registered-models/alias",
            json!({ "name": name, "alias": alias, "version": version }),
        )
        .await?;
        Ok(())
    }

    pub async fn get_model_version_by_alias(&self, name: &str, alias: &str) -> Result<ModelVersion, MlflowError> {
        let envelope: ModelVersionEnvelope = self
            .get("registered-models/alias", &[("name", name), ("alias", alias)])
            .await
            .map_err(|e| not_found_as(e, format!("Model {}@{}", name, alias)))?;
        Ok(envelope.model_version)
    }

    pub async fn get_model_version_download_uri(&self, name: &str, version: &str) -> Result<String, MlflowError> {
        let body: DownloadUriBody = self
            .get("model-versions/get-download-uri", &[("name", name), ("version", version)])
            .await?;
        Ok(body.artifact_uri)
    }

    /// Read `relative_path` under `artifact_uri`
    ///
    /// Supports the tracking server's artifact proxy (`mlflow-artifacts:`),
    /// plain HTTP(S) locations and the local filesystem.
    pub async fn fetch_artifact(&self, artifact_uri: &str, relative_path: &str) -> Result<Vec<u8>, MlflowError> {
        let root = artifact_uri.trim_end_matches('/');
        let relative_path = relative_path.trim_start_matches('/');

        match artifact_location(root) {
            ArtifactLocation::Proxy(path) => {
                let encoded = path
                    .split('/')
                    .chain(relative_path.split('/'))
                    .filter(|s| !s.is_empty())
                    .map(|s| urlencoding::encode(s).into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let url = format!("{}/api/2.0/mlflow-artifacts/artifacts/{}", self.base_url, encoded);
                self.download(&url).await
            }
            ArtifactLocation::Http(base) => {
                let url = format!("{}/{}", base, relative_path);
                self.download(&url).await
            }
            ArtifactLocation::Local(dir) => {
                let path = dir.join(relative_path);
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| MlflowError::ArtifactIo { path, source })
            }
            ArtifactLocation::Unsupported => Err(MlflowError::UnsupportedArtifactUri(root.to_string())),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MlflowError> {
        tracing::debug!("Downloading artifact {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MlflowError::NotFound(format!("Artifact {}", url)));
        }
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Split `runs:/<run_id>/<path>` into its parts
pub fn parse_runs_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("runs:/")?.trim_start_matches('/');
    let (run_id, path) = rest.split_once('/').unwrap_or((rest, ""));
    if run_id.is_empty() {
        return None;
    }
    Some((run_id, path.trim_matches('/')))
}

#[derive(Debug, PartialEq)]
enum ArtifactLocation<'a> {
    Proxy(&'a str),
    Http(&'a str),
    Local(PathBuf),
    Unsupported,
}

fn artifact_location(uri: &str) -> ArtifactLocation<'_> {
    if let Some(rest) = uri.strip_prefix("mlflow-artifacts:") {
        // mlflow-artifacts://host:port/path carries an authority we ignore
        let path = match rest.strip_prefix("//") {
            Some(with_authority) => with_authority.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => rest,
        };
        return ArtifactLocation::Proxy(path.trim_start_matches('/'));
    }
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return ArtifactLocation::Http(uri);
    }
    if let Some(path) = uri.strip_prefix("file://") {
        return ArtifactLocation::Local(PathBuf::from(path));
    }
    if uri.contains("://") || uri.contains(":/") {
        return ArtifactLocation::Unsupported;
    }
    ArtifactLocation::Local(PathBuf::from(uri))
}

async fn check_status(response: Response) -> Result<Response, MlflowError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
    let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
    let (error_code, message) = match parsed {
        Some(b) => (
            b.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            b.message.unwrap_or(body),
        ),
        None => ("UNKNOWN".to_string(), body),
    };

    tracing::warn!("MLflow request failed: {} - {}: {}", status, error_code, message);

    Err(MlflowError::ApiError {
        status: status.as_u16(),
        error_code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, MlflowError> {
    let response = check_status(response).await?;
    let json: Value = response.json().await?;
    serde_json::from_value(json).map_err(|e| MlflowError::InvalidResponse(e.to_string()))
}

fn not_found_as(err: MlflowError, what: String) -> MlflowError {
    match &err {
        MlflowError::ApiError { status: 404, .. } => MlflowError::NotFound(what),
        MlflowError::ApiError { error_code, .. }
            if error_code == "RESOURCE_DOES_NOT_EXIST" || error_code == "INVALID_PARAMETER_VALUE" =>
        {
            MlflowError::NotFound(what)
        }
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = MlflowClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.tracking_uri(), "http://localhost:5000");
        assert_eq!(
            client.api_url("runs/get"),
            "http://localhost:5000/api/2.0/mlflow/runs/get"
        );
    }

    #[test]
    fn test_parse_runs_uri() {
        assert_eq!(parse_runs_uri("runs:/abc123/model"), Some(("abc123", "model")));
        assert_eq!(parse_runs_uri("runs:/abc123"), Some(("abc123", "")));
        assert_eq!(parse_runs_uri("runs://abc123/nested/model/"), Some(("abc123", "nested/model")));
        assert_eq!(parse_runs_uri("runs:/"), None);
        assert_eq!(parse_runs_uri("models:/adult-income@champion"), None);
    }

    #[test]
    fn test_artifact_location() {
        assert_eq!(
            artifact_location("mlflow-artifacts:/1/abc/artifacts/model"),
            ArtifactLocation::Proxy("1/abc/artifacts/model")
        );
        assert_eq!(
            artifact_location("mlflow-artifacts://mlflow:5000/1/abc/artifacts/model"),
            ArtifactLocation::Proxy("1/abc/artifacts/model")
        );
        assert_eq!(
            artifact_location("file:///tmp/mlruns/1/abc/artifacts/model"),
            ArtifactLocation::Local(PathBuf::from("/tmp/mlruns/1/abc/artifacts/model"))
        );
        assert_eq!(
            artifact_location("./mlruns/1/abc/artifacts/model"),
            ArtifactLocation::Local(PathBuf::from("./mlruns/1/abc/artifacts/model"))
        );
        assert_eq!(artifact_location("s3://bucket/model"), ArtifactLocation::Unsupported);
    }

    #[test]
    fn test_not_found_mapping() {
        let err = MlflowError::ApiError {
            status: 404,
            error_code: "RESOURCE_DOES_NOT_EXIST".to_string(),
            message: "missing".to_string(),
        };
        assert!(matches!(not_found_as(err, "Run x".into()), MlflowError::NotFound(_)));
    }
}
