use crate::core::{Cell, FeatureFrame, ModelError, Predictor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// File name of the serialized model inside a model version's artifact directory
pub const ARTIFACT_FILE: &str = "model.json";

/// Serialized model, tagged by flavor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
}

impl ModelArtifact {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ModelError> {
        match self {
            ModelArtifact::LogisticRegression(model) => model.validate(),
        }
    }

    pub fn into_predictor(self) -> Box<dyn Predictor> {
        match self {
            ModelArtifact::LogisticRegression(model) => Box::new(model),
        }
    }
}

/// Standardized numeric input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFeature {
    pub column: String,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub weight: f64,
}

fn default_scale() -> f64 { 1.0 }

/// One-hot encoded categorical input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    pub column: String,
    pub weights: HashMap<String, f64>,
    /// Contribution of a category seen neither in training nor in `weights`
    #[serde(default)]
    pub unknown_weight: f64,
}

/// Binary logistic regression over standardized numerics and one-hot categoricals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub numeric: Vec<NumericFeature>,
    #[serde(default)]
    pub categorical: Vec<CategoricalFeature>,
}

fn default_threshold() -> f64 { 0.5 }

impl LogisticRegression {
    fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if !self.intercept.is_finite()
            || self.numeric.iter().any(|f| !f.weight.is_finite() || !f.mean.is_finite() || !f.scale.is_finite())
        {
            return Err(ModelError::InvalidArtifact("non-finite coefficient".into()));
        }
        Ok(())
    }

    /// Positive class probability for every row
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<f64>, ModelError> {
        // Resolve column positions once per frame
        let numeric_idx = self
            .numeric
            .iter()
            .map(|f| frame.column_index(&f.column))
            .collect::<Result<Vec<_>, _>>()?;
        let categorical_idx = self
            .categorical
            .iter()
            .map(|f| frame.column_index(&f.column))
            .collect::<Result<Vec<_>, _>>()?;

        frame
            .rows()
            .iter()
            .map(|row| {
                let mut z = self.intercept;

                for (feature, &idx) in self.numeric.iter().zip(&numeric_idx) {
                    let x = match &row[idx] {
                        Cell::Int(v) => *v as f64,
                        other => {
                            return Err(ModelError::Coercion(format!(
                                "column '{}' expects integer, got {}",
                                feature.column,
                                other.type_name()
                            )))
                        }
                    };
                    let scale = if feature.scale == 0.0 { 1.0 } else { feature.scale };
                    z += feature.weight * (x - feature.mean) / scale;
                }

                for (feature, &idx) in self.categorical.iter().zip(&categorical_idx) {
                    let category = match &row[idx] {
                        Cell::Str(s) => s.trim(),
                        other => {
                            return Err(ModelError::Coercion(format!(
                                "column '{}' expects string, got {}",
                                feature.column,
                                other.type_name()
                            )))
                        }
                    };
                    z += feature
                        .weights
                        .get(category)
                        .copied()
                        .unwrap_or(feature.unknown_weight);
                }

                if !z.is_finite() {
                    return Err(ModelError::Inference(format!("non-finite score {}", z)));
                }

                Ok(sigmoid(z))
            })
            .collect()
    }
}

impl Predictor for LogisticRegression {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<i64>, ModelError> {
        Ok(self
            .predict_proba(frame)?
            .into_iter()
            .map(|p| i64::from(p >= self.threshold))
            .collect())
    }

    fn flavor(&self) -> &'static str {
        "logistic_regression"
    }
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PredictionInput;

    fn create_test_artifact() -> serde_json::Value {
        serde_json::json!({
            "type": "logistic_regression",
            "intercept": -1.0,
            "numeric": [
                { "column": "capital_gain", "mean": 1000.0, "scale": 1000.0, "weight": 2.0 },
                { "column": "hours_per_week", "mean": 40.0, "scale": 0.0, "weight": 0.1 }
            ],
            "categorical": [
                {
                    "column": "education",
                    "weights": { "Bachelors": 0.5, "HS-grad": -0.5 },
                    "unknown_weight": -0.25
                }
            ]
        })
    }

    fn model() -> LogisticRegression {
        match ModelArtifact::from_slice(&serde_json::to_vec(&create_test_artifact()).unwrap()).unwrap() {
            ModelArtifact::LogisticRegression(m) => m,
        }
    }

    #[test]
    fn test_parse_defaults() {
        let m = model();
        assert_eq!(m.threshold, 0.5);
        assert_eq!(m.numeric.len(), 2);
        assert_eq!(m.categorical[0].unknown_weight, -0.25);
    }

    #[test]
    fn test_example_scores_positive() {
        // z = -1.0 + 2.0 * 1.174 + 0.0 + 0.5 = 1.848
        let frame = FeatureFrame::from_input(&PredictionInput::example());
        let proba = model().predict_proba(&frame).unwrap();
        assert!((proba[0] - sigmoid(1.848)).abs() < 1e-9);
        assert_eq!(model().predict(&frame).unwrap(), vec![1]);
    }

    #[test]
    fn test_low_gain_scores_negative() {
        let mut input = PredictionInput::example();
        input.capital_gain = 0;
        input.education = " HS-grad ".to_string();

        let frame = FeatureFrame::from_input(&input);
        assert_eq!(model().predict(&frame).unwrap(), vec![0]);
    }

    #[test]
    fn test_unknown_category_uses_fallback() {
        let mut input = PredictionInput::example();
        input.education = "Doctorate".to_string();
        input.capital_gain = 1000;

        let frame = FeatureFrame::from_input(&input);
        let proba = model().predict_proba(&frame).unwrap();
        assert!((proba[0] - sigmoid(-1.25)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_column_is_coercion_error() {
        let mut artifact = create_test_artifact();
        artifact["numeric"][0]["column"] = serde_json::json!("income");
        let m = match ModelArtifact::from_slice(&serde_json::to_vec(&artifact).unwrap()).unwrap() {
            ModelArtifact::LogisticRegression(m) => m,
        };

        let frame = FeatureFrame::from_input(&PredictionInput::example());
        assert!(matches!(m.predict(&frame), Err(ModelError::Coercion(_))));
    }

    #[test]
    fn test_type_mismatch_is_coercion_error() {
        let mut artifact = create_test_artifact();
        artifact["numeric"][0]["column"] = serde_json::json!("workclass");
        let m = match ModelArtifact::from_slice(&serde_json::to_vec(&artifact).unwrap()).unwrap() {
            ModelArtifact::LogisticRegression(m) => m,
        };

        let frame = FeatureFrame::from_input(&PredictionInput::example());
        let err = m.predict(&frame).unwrap_err();
        assert!(err.to_string().contains("expects integer"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut artifact = create_test_artifact();
        artifact["threshold"] = serde_json::json!(1.5);
        let err = ModelArtifact::from_slice(&serde_json::to_vec(&artifact).unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArtifact(_)));
    }

    #[test]
    fn test_unknown_flavor_rejected() {
        let err = ModelArtifact::from_slice(br#"{"type": "sklearn_pickle"}"#).unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }
}
