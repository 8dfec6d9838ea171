use crate::core::ModelError;
use crate::models::PredictionInput;

/// A single tabular value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Str(String),
}

impl Cell {
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Int(_) => "integer",
            Cell::Str(_) => "string",
        }
    }
}

/// Column-named rows in the layout the model was trained on
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ModelError> {
        if row.len() != self.columns.len() {
            return Err(ModelError::Coercion(format!(
                "row has {} values but frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// One-row frame holding the 14 request fields in declaration order
    pub fn from_input(input: &PredictionInput) -> Self {
        let columns = [
            "age",
            "workclass",
            "fnlwgt",
            "education",
            "education_num",
            "marital_status",
            "occupation",
            "relationship",
            "race",
            "sex",
            "capital_gain",
            "capital_loss",
            "hours_per_week",
            "native_country",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        let row = vec![
            Cell::Int(input.age),
            Cell::Str(input.workclass.clone()),
            Cell::Int(input.fnlwgt),
            Cell::Str(input.education.clone()),
            Cell::Int(input.education_num),
            Cell::Str(input.marital_status.clone()),
            Cell::Str(input.occupation.clone()),
            Cell::Str(input.relationship.clone()),
            Cell::Str(input.race.clone()),
            Cell::Str(input.sex.clone()),
            Cell::Int(input.capital_gain),
            Cell::Int(input.capital_loss),
            Cell::Int(input.hours_per_week),
            Cell::Str(input.native_country.clone()),
        ];

        Self {
            columns,
            rows: vec![row],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ModelError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ModelError::Coercion(format!("missing column '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_layout() {
        let frame = FeatureFrame::from_input(&PredictionInput::example());

        assert_eq!(frame.len(), 1);
        assert_eq!(frame.columns().len(), 14);
        assert_eq!(frame.columns()[0], "age");
        assert_eq!(frame.columns()[13], "native_country");

        let idx = frame.column_index("hours_per_week").unwrap();
        assert_eq!(frame.rows()[0][idx], Cell::Int(40));
    }

    #[test]
    fn test_unknown_column() {
        let frame = FeatureFrame::from_input(&PredictionInput::example());
        assert!(matches!(
            frame.column_index("income"),
            Err(ModelError::Coercion(_))
        ));
    }

    #[test]
    fn test_push_row_width_mismatch() {
        let mut frame = FeatureFrame::new(vec!["a".to_string(), "b".to_string()]);
        assert!(frame.push_row(vec![Cell::Int(1)]).is_err());
        assert!(frame.push_row(vec![Cell::Int(1), Cell::Str("x".into())]).is_ok());
        assert_eq!(frame.len(), 1);
    }
}
