use serde::{Deserialize, Serialize};

/// One census record to classify
///
/// Only the shape is checked (every field present with the right JSON type);
/// values are passed to the model as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub age: i64,
    pub workclass: String,
    pub fnlwgt: i64,
    pub education: String,
    pub education_num: i64,
    pub marital_status: String,
    pub occupation: String,
    pub relationship: String,
    pub race: String,
    pub sex: String,
    pub capital_gain: i64,
    pub capital_loss: i64,
    pub hours_per_week: i64,
    pub native_country: String,
}

impl PredictionInput {
    /// The documented example record
    pub fn example() -> Self {
        Self {
            age: 39,
            workclass: "State-gov".to_string(),
            fnlwgt: 77516,
            education: "Bachelors".to_string(),
            education_num: 13,
            marital_status: "Never-married".to_string(),
            occupation: "Adm-clerical".to_string(),
            relationship: "Not-in-family".to_string(),
            race: "White".to_string(),
            sex: "Male".to_string(),
            capital_gain: 2174,
            capital_loss: 0,
            hours_per_week: 40,
            native_country: "United-States".to_string(),
        }
    }
}
