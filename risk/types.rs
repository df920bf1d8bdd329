use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Numeric features ordered exactly like the expected column schema.
///
/// Produced by the feature encoder; entry `i` holds the value of schema column `i`.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignedFeatureVector(pub Array1<f64>);

impl AlignedFeatureVector {
    pub fn new(values: Array1<f64>) -> Self {
        Self(values)
    }

    pub fn zeros(len: usize) -> Self {
        Self(Array1::zeros(len))
    }

    pub fn into_inner(self) -> Array1<f64> {
        self.0
    }

    pub fn as_view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }
}

impl Deref for AlignedFeatureVector {
    type Target = Array1<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for AlignedFeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }
}

impl From<Array1<f64>> for AlignedFeatureVector {
    fn from(values: Array1<f64>) -> Self {
        Self(values)
    }
}

/// An aligned vector after the fitted scaler has been applied. Same length and order.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledFeatureVector(pub Array1<f64>);

impl ScaledFeatureVector {
    pub fn new(values: Array1<f64>) -> Self {
        Self(values)
    }

    pub fn into_inner(self) -> Array1<f64> {
        self.0
    }

    pub fn as_view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }
}

impl Deref for ScaledFeatureVector {
    type Target = Array1<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for ScaledFeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }
}

impl From<Array1<f64>> for ScaledFeatureVector {
    fn from(values: Array1<f64>) -> Self {
        Self(values)
    }
}

impl From<ScaledFeatureVector> for Array1<f64> {
    fn from(values: ScaledFeatureVector) -> Self {
        values.0
    }
}
