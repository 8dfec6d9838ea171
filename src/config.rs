use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Application configuration shared by the API and the two scripts
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub mlflow: MlflowSettings,
    pub model: ModelSettings,
    pub registrar: RegistrarSettings,
    pub dataset: DatasetSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MlflowSettings {
    pub tracking_uri: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Model identity the prediction service resolves at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarSettings {
    /// Used when `MODEL_NAME` is not set
    pub default_model_name: String,
    pub stage: String,
    pub alias: String,
    pub run_id_file: PathBuf,
    pub await_registration_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    pub dir: PathBuf,
    pub data_url: String,
    pub test_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_timeout_secs() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

pub const DEFAULT_DATA_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/adult/adult.data";
pub const DEFAULT_TEST_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/adult/adult.test";

impl Settings {
    /// Load configuration from defaults, files and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables prefixed with ADULT_INCOME__
    /// 4. The unprefixed deployment variables (MLFLOW_TRACKING_URI, MODEL_NAME, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let builder = with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ADULT_INCOME__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ADULT_INCOME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        apply_deployment_overrides(builder.build()?, |key| std::env::var(key).ok())?
            .try_deserialize()
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.workers", 4)?
        .set_default("mlflow.tracking_uri", "http://localhost:5000")?
        .set_default("mlflow.timeout_secs", 30)?
        .set_default("model.name", "adult-income")?
        .set_default("model.alias", "champion")?
        .set_default("registrar.default_model_name", "no_name")?
        .set_default("registrar.stage", "Staging")?
        .set_default("registrar.alias", "champion")?
        .set_default("registrar.run_id_file", "run_id.txt")?
        .set_default("registrar.await_registration_secs", 300)?
        .set_default("registrar.poll_interval_ms", 1000)?
        .set_default("dataset.dir", "data/raw")?
        .set_default("dataset.data_url", DEFAULT_DATA_URL)?
        .set_default("dataset.test_url", DEFAULT_TEST_URL)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "json")
}

/// Unprefixed variables the deployment sets directly, and the keys they override
const DEPLOYMENT_VARS: &[(&str, &str)] = &[
    ("MLFLOW_TRACKING_URI", "mlflow.tracking_uri"),
    ("MODEL_NAME", "model.name"),
    ("MODEL_ALIAS", "model.alias"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

fn apply_deployment_overrides<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    for (var, key) in DEPLOYMENT_VARS {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            builder = builder.set_override(*key, value)?;
        }
    }

    builder.build()
}

/// Model name for the registrar: `MODEL_NAME`, or the configured placeholder
pub fn registrar_model_name(settings: &RegistrarSettings) -> String {
    std::env::var("MODEL_NAME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| settings.default_model_name.clone())
}

/// One place a run identifier may come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunIdSource {
    Env(String),
    File(PathBuf),
}

impl std::fmt::Display for RunIdSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunIdSource::Env(var) => write!(f, "env:{}", var),
            RunIdSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunIdError {
    #[error("no run id found (tried {tried})")]
    NotFound { tried: String },

    #[error("failed to read run id from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered list of run id sources: the first one that yields a non-empty value wins
#[derive(Debug, Clone)]
pub struct RunIdResolver {
    sources: Vec<RunIdSource>,
}

impl RunIdResolver {
    pub fn new(sources: Vec<RunIdSource>) -> Self {
        Self { sources }
    }

    /// `RUN_ID`, then the run id file
    pub fn standard<P: Into<PathBuf>>(run_id_file: P) -> Self {
        Self::new(vec![
            RunIdSource::Env("RUN_ID".to_string()),
            RunIdSource::File(run_id_file.into()),
        ])
    }

    pub fn sources(&self) -> &[RunIdSource] {
        &self.sources
    }

    pub fn resolve(&self) -> Result<String, RunIdError> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    /// Resolve with a custom environment lookup
    ///
    /// A missing file moves on to the next source; any other read error aborts.
    pub fn resolve_with<F>(&self, env: F) -> Result<String, RunIdError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for source in &self.sources {
            let value = match source {
                RunIdSource::Env(var) => env(var),
                RunIdSource::File(path) => match std::fs::read_to_string(path) {
                    Ok(contents) => Some(contents),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        return Err(RunIdError::Read {
                            path: path.clone(),
                            source: e,
                        })
                    }
                },
            };

            if let Some(run_id) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                tracing::debug!("Resolved run id from {}", source);
                return Ok(run_id);
            }
        }

        Err(RunIdError::NotFound {
            tried: self
                .sources
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}
