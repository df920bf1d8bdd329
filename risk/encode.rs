//! # Feature Encoder
//!
//! Turns a raw patient record into the exact ordered vector the scaler and
//! classifier were fitted on.
//!
//! - Numeric fields are passed through under their own column name.
//! - Categorical fields become a single indicator column named
//!   `{field}_{category}` set to 1. Categories that were not selected produce no
//!   entry at all.
//! - Every schema column without a value is 0.
//! - Synthesized columns the schema does not know (an unseen category) are
//!   dropped without error, so records carrying new categories keep producing a
//!   prediction. This leniency is part of the contract, not a validation gap.

use crate::record::{RawFeature, RawPatientRecord};
use crate::schema::ExpectedColumnSchema;
use crate::types::AlignedFeatureVector;
use ahash::AHashMap;

/// Name of the indicator column for `category` of the categorical field `field`.
///
/// `one_hot_column("Sex", "M") == "Sex_M"`. The name must match the column produced
/// by one-hot expansion at training time, character for character.
pub fn one_hot_column(field: &str, category: &str) -> String {
    let mut name = String::with_capacity(field.len() + category.len() + 1);
    name.push_str(field);
    name.push('_');
    name.push_str(category);
    name
}

/// The aligned vector together with what the encoder did to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub vector: AlignedFeatureVector,
    /// Synthesized columns absent from the schema, in raw feature order.
    pub dropped_columns: Vec<String>,
    /// Schema columns that received no raw value and were set to 0, in schema order.
    pub defaulted_columns: Vec<String>,
}

/// Encodes a patient record against the expected column schema.
pub fn encode(record: &RawPatientRecord, schema: &ExpectedColumnSchema) -> AlignedFeatureVector {
    encode_with_report(record.features(), schema).vector
}

/// Encodes an arbitrary set of raw features. Fields that are absent simply leave
/// their columns at 0.
pub fn encode_features<'a, I>(features: I, schema: &ExpectedColumnSchema) -> AlignedFeatureVector
where
    I: IntoIterator<Item = RawFeature<'a>>,
{
    encode_with_report(features, schema).vector
}

/// Same as [`encode_features`], also reporting dropped and defaulted columns.
pub fn encode_with_report<'a, I>(features: I, schema: &ExpectedColumnSchema) -> Encoding
where
    I: IntoIterator<Item = RawFeature<'a>>,
{
    // Synthesized column -> value, in the order the raw features were supplied.
    let mut present: AHashMap<String, f64> = AHashMap::new();
    let mut order: Vec<String> = Vec::new();

    for feature in features {
        let (column, value) = match feature {
            RawFeature::Numeric { field, value } => (field.column_name().to_string(), value),
            RawFeature::Categorical { field, category } => {
                (one_hot_column(field.column_name(), category), 1.0)
            }
        };
        if present.insert(column.clone(), value).is_none() {
            order.push(column);
        }
    }

    let mut defaulted_columns = Vec::new();
    let values: Vec<f64> = schema
        .iter()
        .map(|column| match present.get(column) {
            Some(&value) => value,
            None => {
                defaulted_columns.push(column.to_string());
                0.0
            }
        })
        .collect();

    let dropped_columns: Vec<String> = order
        .into_iter()
        .filter(|column| !schema.contains(column))
        .collect();
    for column in &dropped_columns {
        log::debug!("Dropping column '{column}': not part of the expected column schema");
    }

    Encoding {
        vector: AlignedFeatureVector::from(values),
        dropped_columns,
        defaulted_columns,
    }
}
