//! # Normalizer
//!
//! Applies a previously-fitted per-column affine transform,
//! `scaled[i] = (x[i] - offset[i]) / scale[i]`, to an aligned feature vector.
//! The parameters come from training and are treated as constants here.

use crate::types::{AlignedFeatureVector, ScaledFeatureVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the scaler was fitted upstream. Informational only: both kinds are applied
/// through the same offset/scale arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    /// Offset is the column mean, scale the column standard deviation.
    #[default]
    Standard,
    /// Offset is the column minimum, scale the column range.
    MinMax,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("Feature vector has {found} columns, but the scaler was fitted on {expected}.")]
    DimensionMismatch { found: usize, expected: usize },
    #[error("Scaler has {offsets} offsets but {scales} scales; both must cover every column.")]
    ParameterLengthMismatch { offsets: usize, scales: usize },
    #[error("Scaler has {feature_names} feature names but {columns} columns.")]
    FeatureNameCountMismatch { feature_names: usize, columns: usize },
    #[error("Scale for column {column} is {value}; scales must be finite and non-zero.")]
    InvalidScale { column: usize, value: f64 },
    #[error("Offset for column {column} is {value}; offsets must be finite.")]
    InvalidOffset { column: usize, value: f64 },
}

/// A fitted affine scaler, as stored in `scaler.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    #[serde(default)]
    pub kind: ScalerKind,
    /// Column names seen at fit time, when the training run recorded them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub offset: Array1<f64>,
    pub scale: Array1<f64>,
}

impl FittedScaler {
    pub fn new(
        kind: ScalerKind,
        offset: Array1<f64>,
        scale: Array1<f64>,
    ) -> Result<Self, ScaleError> {
        let scaler = Self {
            kind,
            offset,
            scale,
            feature_names: None,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Offset 0 and scale 1 on every column; leaves vectors unchanged.
    pub fn identity(len: usize) -> Self {
        Self {
            kind: ScalerKind::Standard,
            offset: Array1::zeros(len),
            scale: Array1::ones(len),
            feature_names: None,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, ScaleError> {
        self.feature_names = Some(names);
        self.validate()?;
        Ok(self)
    }

    /// Number of columns the scaler was fitted on.
    pub fn expected_length(&self) -> usize {
        self.offset.len()
    }

    /// Checks the invariants a deserialized scaler cannot guarantee on its own.
    pub fn validate(&self) -> Result<(), ScaleError> {
        if self.offset.len() != self.scale.len() {
            return Err(ScaleError::ParameterLengthMismatch {
                offsets: self.offset.len(),
                scales: self.scale.len(),
            });
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.offset.len() {
                return Err(ScaleError::FeatureNameCountMismatch {
                    feature_names: names.len(),
                    columns: self.offset.len(),
                });
            }
        }
        if let Some((column, &value)) = self
            .offset
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ScaleError::InvalidOffset { column, value });
        }
        if let Some((column, &value)) = self
            .scale
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v == 0.0)
        {
            return Err(ScaleError::InvalidScale { column, value });
        }
        Ok(())
    }

    /// Applies the fitted transform. Fails if the vector width differs from the fit.
    pub fn transform(
        &self,
        vector: &AlignedFeatureVector,
    ) -> Result<ScaledFeatureVector, ScaleError> {
        if vector.len() != self.expected_length() {
            return Err(ScaleError::DimensionMismatch {
                found: vector.len(),
                expected: self.expected_length(),
            });
        }
        let scaled = (&vector.0 - &self.offset) / &self.scale;
        Ok(ScaledFeatureVector::new(scaled))
    }
}

/// Free-function form of [`FittedScaler::transform`].
pub fn normalize(
    vector: &AlignedFeatureVector,
    scaler: &FittedScaler,
) -> Result<ScaledFeatureVector, ScaleError> {
    scaler.transform(vector)
}
