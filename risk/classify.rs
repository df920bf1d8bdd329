//! # Risk Classifier
//!
//! The contract the pipeline consumes (`RiskClassifier`) and the fitted
//! nearest-neighbor model stored in `classifier.toml`.

use crate::types::ScaledFeatureVector;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Binary outcome of the classifier. Class 1 is high risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    LowRisk,
    HighRisk,
}

impl RiskLabel {
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(RiskLabel::LowRisk),
            1 => Some(RiskLabel::HighRisk),
            _ => None,
        }
    }

    pub fn class(self) -> u8 {
        match self {
            RiskLabel::LowRisk => 0,
            RiskLabel::HighRisk => 1,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::LowRisk => f.write_str("Low Risk"),
            RiskLabel::HighRisk => f.write_str("High Risk"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Input has {found} features, but the classifier was fitted on {expected}.")]
    DimensionMismatch { found: usize, expected: usize },
    #[error("Classifier has {samples} training samples but {labels} labels.")]
    LabelCountMismatch { samples: usize, labels: usize },
    #[error("Classifier has no training samples.")]
    NoSamples,
    #[error("Label {label} at sample {index} is not a binary class (expected 0 or 1).")]
    InvalidLabel { index: usize, label: u8 },
    #[error("n_neighbors is {n_neighbors}, but must be between 1 and the {samples} training samples.")]
    InvalidNeighborCount { n_neighbors: usize, samples: usize },
    #[error("Minkowski power p = {0} is invalid; it must be finite and at least 1.")]
    InvalidMinkowskiPower(f64),
    #[error("Training sample {index} contains a non-finite value.")]
    NonFiniteSample { index: usize },
    #[error("Classifier returned probability {0}, outside [0, 1].")]
    ProbabilityOutOfRange(f64),
}

/// What the pipeline needs from a fitted classifier.
pub trait RiskClassifier {
    /// Width of the scaled vectors the classifier was fitted on.
    fn n_features(&self) -> usize;

    fn predict(&self, scaled: &ScaledFeatureVector) -> Result<RiskLabel, ClassifierError>;

    /// Probability mass assigned to the high-risk class.
    fn predict_probability(&self, scaled: &ScaledFeatureVector) -> Result<f64, ClassifierError>;

    /// Short human-readable model name, used by the report.
    fn name(&self) -> &str {
        "classifier"
    }
}

/// How neighbor votes are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborWeights {
    /// Every neighbor counts once.
    #[default]
    Uniform,
    /// Neighbors count by the inverse of their distance. Exact matches take all the weight.
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    Minkowski { p: f64 },
}

impl DistanceMetric {
    pub fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match *self {
            DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => diffs.sum(),
            DistanceMetric::Minkowski { p } => diffs.map(|d| d.powf(p)).sum::<f64>().powf(1.0 / p),
        }
    }
}

/// A neighbor of a query point: its training-sample index and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Fitted k-nearest-neighbor classifier over scaled training samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    pub n_neighbors: usize,
    #[serde(default)]
    pub weights: NeighborWeights,
    /// Class of each training sample, 0 or 1.
    pub labels: Vec<u8>,
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Scaled training samples, shape `[n_samples, n_features]`.
    pub samples: Array2<f64>,
}

impl KnnClassifier {
    pub fn new(
        samples: Array2<f64>,
        labels: Vec<u8>,
        n_neighbors: usize,
        weights: NeighborWeights,
        metric: DistanceMetric,
    ) -> Result<Self, ClassifierError> {
        let model = Self {
            n_neighbors,
            weights,
            labels,
            metric,
            samples,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// Checks the invariants a deserialized model cannot guarantee on its own.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.samples.nrows() == 0 {
            return Err(ClassifierError::NoSamples);
        }
        if self.samples.nrows() != self.labels.len() {
            return Err(ClassifierError::LabelCountMismatch {
                samples: self.samples.nrows(),
                labels: self.labels.len(),
            });
        }
        if let Some((index, &label)) = self.labels.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(ClassifierError::InvalidLabel { index, label });
        }
        if self.n_neighbors == 0 || self.n_neighbors > self.samples.nrows() {
            return Err(ClassifierError::InvalidNeighborCount {
                n_neighbors: self.n_neighbors,
                samples: self.samples.nrows(),
            });
        }
        if let DistanceMetric::Minkowski { p } = self.metric {
            if !p.is_finite() || p < 1.0 {
                return Err(ClassifierError::InvalidMinkowskiPower(p));
            }
        }
        if let Some(index) = self
            .samples
            .rows()
            .into_iter()
            .position(|row| row.iter().any(|v| !v.is_finite()))
        {
            return Err(ClassifierError::NonFiniteSample { index });
        }
        Ok(())
    }

    /// The `n_neighbors` closest training samples, nearest first.
    /// Samples at equal distance keep their training order.
    pub fn kneighbors(
        &self,
        scaled: &ScaledFeatureVector,
    ) -> Result<Vec<Neighbor>, ClassifierError> {
        self.check_width(scaled)?;
        let query = scaled.as_view();
        let mut neighbors: Vec<Neighbor> = self
            .samples
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: self.metric.distance(row, query),
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });
        neighbors.truncate(self.n_neighbors);
        Ok(neighbors)
    }

    /// Weighted votes `[class 0, class 1]` cast by the nearest neighbors.
    fn votes(&self, scaled: &ScaledFeatureVector) -> Result<[f64; 2], ClassifierError> {
        let neighbors = self.kneighbors(scaled)?;
        let weights: Vec<f64> = match self.weights {
            NeighborWeights::Uniform => vec![1.0; neighbors.len()],
            NeighborWeights::Distance => {
                if neighbors.iter().any(|n| n.distance == 0.0) {
                    neighbors
                        .iter()
                        .map(|n| if n.distance == 0.0 { 1.0 } else { 0.0 })
                        .collect()
                } else {
                    neighbors.iter().map(|n| 1.0 / n.distance).collect()
                }
            }
        };

        let mut votes = [0.0_f64; 2];
        for (neighbor, weight) in neighbors.iter().zip(weights) {
            votes[usize::from(self.labels[neighbor.index])] += weight;
        }
        Ok(votes)
    }

    fn check_width(&self, scaled: &ScaledFeatureVector) -> Result<(), ClassifierError> {
        if scaled.len() != self.samples.ncols() {
            return Err(ClassifierError::DimensionMismatch {
                found: scaled.len(),
                expected: self.samples.ncols(),
            });
        }
        Ok(())
    }
}

impl RiskClassifier for KnnClassifier {
    fn n_features(&self) -> usize {
        self.samples.ncols()
    }

    /// High risk only when the class-1 vote strictly outweighs the class-0 vote.
    fn predict(&self, scaled: &ScaledFeatureVector) -> Result<RiskLabel, ClassifierError> {
        let [low, high] = self.votes(scaled)?;
        Ok(if high > low {
            RiskLabel::HighRisk
        } else {
            RiskLabel::LowRisk
        })
    }

    fn predict_probability(&self, scaled: &ScaledFeatureVector) -> Result<f64, ClassifierError> {
        let [low, high] = self.votes(scaled)?;
        let total = low + high;
        if total == 0.0 {
            return Ok(0.0);
        }
        Ok(high / total)
    }

    fn name(&self) -> &str {
        "KNN"
    }
}
