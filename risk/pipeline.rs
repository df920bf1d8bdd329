//! # Inference Pipeline
//!
//! Feature encoder, then normalizer, then risk classifier, run once per request.
//! The schema, scaler and classifier are passed in rather than read from globals,
//! so any `RiskClassifier` (including test doubles) can sit at the end.

use crate::artifacts::ArtifactBundle;
use crate::classify::{ClassifierError, KnnClassifier, RiskClassifier};
use crate::encode::{Encoding, encode_with_report};
use crate::record::RawPatientRecord;
use crate::report::PredictionResult;
use crate::scale::{FittedScaler, ScaleError};
use crate::schema::ExpectedColumnSchema;
use crate::types::ScaledFeatureVector;
use std::fmt;
use thiserror::Error;

/// The component that rejected a vector of the wrong width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Normalizer,
    Classifier,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Normalizer => f.write_str("normalizer"),
            PipelineStage::Classifier => f.write_str("classifier"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(
        "The {stage} expected {expected} columns but received {found}. The column schema, scaler and classifier must come from the same training run."
    )]
    DimensionMismatch {
        stage: PipelineStage,
        found: usize,
        expected: usize,
    },
    #[error("Scaling failed: {0}")]
    Scale(ScaleError),
    #[error("Classification failed: {0}")]
    Classifier(ClassifierError),
}

impl From<ScaleError> for PipelineError {
    fn from(err: ScaleError) -> Self {
        match err {
            ScaleError::DimensionMismatch { found, expected } => PipelineError::DimensionMismatch {
                stage: PipelineStage::Normalizer,
                found,
                expected,
            },
            other => PipelineError::Scale(other),
        }
    }
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::DimensionMismatch { found, expected } => {
                PipelineError::DimensionMismatch {
                    stage: PipelineStage::Classifier,
                    found,
                    expected,
                }
            }
            other => PipelineError::Classifier(other),
        }
    }
}

/// Model-ready input for one record, with the encoder's diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInput {
    pub encoding: Encoding,
    pub scaled: ScaledFeatureVector,
}

/// Encodes and scales a record.
pub fn prepare(
    record: &RawPatientRecord,
    schema: &ExpectedColumnSchema,
    scaler: &FittedScaler,
) -> Result<PreparedInput, PipelineError> {
    let encoding = encode_with_report(record.features(), schema);
    log::debug!(
        "Encoded record into {} columns ({} dropped, {} defaulted to zero)",
        encoding.vector.len(),
        encoding.dropped_columns.len(),
        encoding.defaulted_columns.len()
    );
    let scaled = scaler.transform(&encoding.vector)?;
    Ok(PreparedInput { encoding, scaled })
}

/// Runs the classifier on an already-scaled vector.
pub fn classify<C>(
    scaled: &ScaledFeatureVector,
    classifier: &C,
) -> Result<PredictionResult, PipelineError>
where
    C: RiskClassifier + ?Sized,
{
    if scaled.len() != classifier.n_features() {
        return Err(PipelineError::DimensionMismatch {
            stage: PipelineStage::Classifier,
            found: scaled.len(),
            expected: classifier.n_features(),
        });
    }

    let label = classifier.predict(scaled)?;
    let probability = classifier.predict_probability(scaled)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ClassifierError::ProbabilityOutOfRange(probability).into());
    }
    log::debug!("Classifier returned {label} with probability {probability:.4}");

    Ok(PredictionResult { label, probability })
}

/// Encodes, scales and classifies one record.
pub fn assess<C>(
    record: &RawPatientRecord,
    schema: &ExpectedColumnSchema,
    scaler: &FittedScaler,
    classifier: &C,
) -> Result<PredictionResult, PipelineError>
where
    C: RiskClassifier + ?Sized,
{
    let prepared = prepare(record, schema, scaler)?;
    classify(&prepared.scaled, classifier)
}

/// The three loaded artifacts, held for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RiskPipeline<C = KnnClassifier> {
    schema: ExpectedColumnSchema,
    scaler: FittedScaler,
    classifier: C,
}

impl<C: RiskClassifier> RiskPipeline<C> {
    pub fn new(schema: ExpectedColumnSchema, scaler: FittedScaler, classifier: C) -> Self {
        Self {
            schema,
            scaler,
            classifier,
        }
    }

    pub fn schema(&self) -> &ExpectedColumnSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn prepare(&self, record: &RawPatientRecord) -> Result<PreparedInput, PipelineError> {
        prepare(record, &self.schema, &self.scaler)
    }

    pub fn assess(&self, record: &RawPatientRecord) -> Result<PredictionResult, PipelineError> {
        assess(record, &self.schema, &self.scaler, &self.classifier)
    }
}

impl From<ArtifactBundle> for RiskPipeline<KnnClassifier> {
    fn from(bundle: ArtifactBundle) -> Self {
        Self::new(bundle.schema, bundle.scaler, bundle.classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RiskLabel;

    /// Returns a fixed answer regardless of input.
    struct FixedClassifier {
        n_features: usize,
        label: RiskLabel,
        probability: f64,
    }

    impl RiskClassifier for FixedClassifier {
        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict(&self, scaled: &ScaledFeatureVector) -> Result<RiskLabel, ClassifierError> {
            assert_eq!(scaled.len(), self.n_features);
            Ok(self.label)
        }

        fn predict_probability(
            &self,
            scaled: &ScaledFeatureVector,
        ) -> Result<f64, ClassifierError> {
            assert_eq!(scaled.len(), self.n_features);
            Ok(self.probability)
        }
    }

    fn schema() -> ExpectedColumnSchema {
        ExpectedColumnSchema::new(["Age", "Sex_M", "Sex_F", "MaxHR"]).unwrap()
    }

    #[test]
    fn assess_returns_classifier_label_and_probability() {
        let classifier = FixedClassifier {
            n_features: 4,
            label: RiskLabel::HighRisk,
            probability: 0.81,
        };
        let pipeline = RiskPipeline::new(schema(), FittedScaler::identity(4), classifier);
        let result = pipeline.assess(&RawPatientRecord::default()).unwrap();
        assert_eq!(result.label, RiskLabel::HighRisk);
        assert_eq!(result.probability, 0.81);
    }

    #[test]
    fn scaler_width_skew_is_a_normalizer_dimension_mismatch() {
        let classifier = FixedClassifier {
            n_features: 4,
            label: RiskLabel::LowRisk,
            probability: 0.1,
        };
        let err = assess(
            &RawPatientRecord::default(),
            &schema(),
            &FittedScaler::identity(5),
            &classifier,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PipelineError::DimensionMismatch {
                stage: PipelineStage::Normalizer,
                found: 4,
                expected: 5,
            }
        );
    }

    #[test]
    fn classifier_width_skew_is_a_classifier_dimension_mismatch() {
        let classifier = FixedClassifier {
            n_features: 3,
            label: RiskLabel::LowRisk,
            probability: 0.1,
        };
        let err = assess(
            &RawPatientRecord::default(),
            &schema(),
            &FittedScaler::identity(4),
            &classifier,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PipelineError::DimensionMismatch {
                stage: PipelineStage::Classifier,
                found: 4,
                expected: 3,
            }
        );
    }

    #[test]
    fn out_of_range_probability_fails_the_request() {
        let classifier = FixedClassifier {
            n_features: 4,
            label: RiskLabel::HighRisk,
            probability: 1.2,
        };
        let err = assess(
            &RawPatientRecord::default(),
            &schema(),
            &FittedScaler::identity(4),
            &classifier,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Classifier(ClassifierError::ProbabilityOutOfRange(1.2))
        );
    }

    #[test]
    fn works_through_a_trait_object() {
        let classifier: Box<dyn RiskClassifier> = Box::new(FixedClassifier {
            n_features: 4,
            label: RiskLabel::LowRisk,
            probability: 0.12,
        });
        let result = assess(
            &RawPatientRecord::default(),
            &schema(),
            &FittedScaler::identity(4),
            classifier.as_ref(),
        )
        .unwrap();
        assert_eq!(result.label, RiskLabel::LowRisk);
        assert_eq!(result.probability_percent(), "12.00%");
    }
}
