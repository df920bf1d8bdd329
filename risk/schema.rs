//! # Expected Column Schema
//!
//! The ordered list of feature-column names the classifier was trained on.
//! It is loaded once per process and never mutated; the encoder, the scaler and
//! the classifier all rely on its order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("The expected column schema is empty; at least one column is required.")]
    Empty,
    #[error("Column '{name}' appears more than once in the expected column schema (positions {first} and {second}).")]
    DuplicateColumn {
        name: String,
        first: usize,
        second: usize,
    },
    #[error("The expected column schema contains a blank column name at position {0}.")]
    BlankColumn(usize),
}

/// On-disk form of the schema: `columns = ["Age", "RestingBP", ...]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub columns: Vec<String>,
}

/// Ordered, duplicate-free column names fixed at training time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedColumnSchema {
    columns: Vec<String>,
    positions: AHashMap<String, usize>,
}

impl ExpectedColumnSchema {
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut positions = AHashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::BlankColumn(idx));
            }
            if let Some(&first) = positions.get(name) {
                return Err(SchemaError::DuplicateColumn {
                    name: name.clone(),
                    first,
                    second: idx,
                });
            }
            positions.insert(name.clone(), idx);
        }

        Ok(Self { columns, positions })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for a constructed schema; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    pub fn to_file(&self) -> SchemaFile {
        SchemaFile {
            columns: self.columns.clone(),
        }
    }
}

impl TryFrom<SchemaFile> for ExpectedColumnSchema {
    type Error = SchemaError;

    fn try_from(file: SchemaFile) -> Result<Self, Self::Error> {
        Self::new(file.columns)
    }
}

impl<'a> IntoIterator for &'a ExpectedColumnSchema {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_training_order() {
        let schema = ExpectedColumnSchema::new(["Age", "Sex_M", "RestingBP"]).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("Age"), Some(0));
        assert_eq!(schema.position("Sex_M"), Some(1));
        assert_eq!(schema.position("RestingBP"), Some(2));
        assert_eq!(schema.position("Sex_F"), None);
        assert_eq!(
            schema.iter().collect::<Vec<_>>(),
            vec!["Age", "Sex_M", "RestingBP"]
        );
    }

    #[test]
    fn rejects_empty_schema() {
        let err = ExpectedColumnSchema::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, SchemaError::Empty);
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = ExpectedColumnSchema::new(["Age", "Sex_M", "Age"]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                name: "Age".to_string(),
                first: 0,
                second: 2,
            }
        );
    }

    #[test]
    fn rejects_blank_columns() {
        let err = ExpectedColumnSchema::new(["Age", "  "]).unwrap_err();
        assert_eq!(err, SchemaError::BlankColumn(1));
    }

    #[test]
    fn schema_file_round_trips_through_toml() {
        let schema = ExpectedColumnSchema::new(["Age", "Oldpeak", "ST_Slope_Up"]).unwrap();
        let text = toml::to_string_pretty(&schema.to_file()).unwrap();
        let parsed: SchemaFile = toml::from_str(&text).unwrap();
        let reloaded = ExpectedColumnSchema::try_from(parsed).unwrap();
        assert_eq!(reloaded, schema);
    }
}
