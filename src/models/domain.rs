use serde::{Deserialize, Serialize};

/// Binary income class predicted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeClass {
    #[serde(rename = "<=50K")]
    AtMost50K,
    #[serde(rename = ">50K")]
    Above50K,
}

impl IncomeClass {
    /// 1 is the positive class; every other value maps to `<=50K`
    pub fn from_prediction(value: i64) -> Self {
        if value == 1 {
            IncomeClass::Above50K
        } else {
            IncomeClass::AtMost50K
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IncomeClass::AtMost50K => "<=50K",
            IncomeClass::Above50K => ">50K",
        }
    }
}

impl std::fmt::Display for IncomeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Registration state of a model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVersionStatus {
    PendingRegistration,
    FailedRegistration,
    Ready,
}

/// Model version as returned by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub status: Option<ModelVersionStatus>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
}

impl ModelVersion {
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.creation_timestamp
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
    }

    /// Versions without a status field come from servers that register synchronously
    pub fn is_ready(&self) -> bool {
        matches!(self.status, None | Some(ModelVersionStatus::Ready))
    }
}

/// Tracking run metadata needed to locate its artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub artifact_uri: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Result of a completed register -> transition -> alias sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub name: String,
    pub version: String,
    pub stage: String,
    pub alias: String,
}
