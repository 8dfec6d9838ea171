use crate::core::{FeatureFrame, ModelError, Predictor};
use crate::models::{IncomeClass, PredictionInput};
use std::sync::Arc;

/// A model resolved from the registry and ready to serve
pub struct LoadedModel {
    pub name: String,
    pub alias: String,
    pub version: String,
    pub run_id: Option<String>,
    predictor: Box<dyn Predictor>,
}

impl LoadedModel {
    pub fn new(
        name: impl Into<String>,
        alias: impl Into<String>,
        version: impl Into<String>,
        run_id: Option<String>,
        predictor: Box<dyn Predictor>,
    ) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            version: version.into(),
            run_id,
            predictor,
        }
    }

    pub fn flavor(&self) -> &'static str {
        self.predictor.flavor()
    }

    /// Coerce one record into a frame, run the model and map the first output
    pub fn predict(&self, input: &PredictionInput) -> Result<(i64, IncomeClass), ModelError> {
        let frame = FeatureFrame::from_input(input);
        let output = self.predictor.predict(&frame)?;

        let value = output
            .first()
            .copied()
            .ok_or_else(|| ModelError::Inference("model returned no predictions".into()))?;

        Ok((value, IncomeClass::from_prediction(value)))
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("version", &self.version)
            .field("run_id", &self.run_id)
            .field("flavor", &self.flavor())
            .finish()
    }
}

/// Model availability, decided once at startup and never re-evaluated
#[derive(Debug, Clone)]
pub enum ModelState {
    Loaded(Arc<LoadedModel>),
    Unavailable { reason: String },
}

impl ModelState {
    pub fn loaded(model: LoadedModel) -> Self {
        ModelState::Loaded(Arc::new(model))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelState::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        match self {
            ModelState::Loaded(model) => Some(model),
            ModelState::Unavailable { .. } => None,
        }
    }
}
