//! # Model Artifacts
//!
//! Loads the three read-only resources produced by one training run: the
//! fitted classifier, the fitted scaler and the expected column schema. They are
//! loaded once at start-up; any failure here is fatal to start-up, never to an
//! individual request.

use crate::classify::{ClassifierError, KnnClassifier, RiskClassifier};
use crate::scale::{FittedScaler, ScaleError};
use crate::schema::{ExpectedColumnSchema, SchemaError, SchemaFile};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CLASSIFIER_FILE_NAME: &str = "classifier.toml";
pub const SCALER_FILE_NAME: &str = "scaler.toml";
pub const SCHEMA_FILE_NAME: &str = "columns.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    Schema,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Classifier => f.write_str("classifier"),
            ArtifactKind::Scaler => f.write_str("scaler"),
            ArtifactKind::Schema => f.write_str("column schema"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to load the {kind} artifact from '{}': {source}", .path.display())]
    MissingArtifact {
        kind: ArtifactKind,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse the {kind} artifact '{}': {source}", .path.display())]
    Malformed {
        kind: ArtifactKind,
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("The {kind} artifact '{}' is invalid: {reason}", .path.display())]
    Invalid {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    #[error("Failed to serialize the {kind} artifact: {source}")]
    Serialize {
        kind: ArtifactKind,
        source: toml::ser::Error,
    },
    #[error("Failed to write artifact file: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the three artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub schema: PathBuf,
}

impl ArtifactPaths {
    /// The default file names inside one artifact directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            classifier: dir.join(CLASSIFIER_FILE_NAME),
            scaler: dir.join(SCALER_FILE_NAME),
            schema: dir.join(SCHEMA_FILE_NAME),
        }
    }
}

/// The schema, scaler and classifier from one training run, loaded and validated.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub schema: ExpectedColumnSchema,
    pub scaler: FittedScaler,
    pub classifier: KnnClassifier,
}

impl ArtifactBundle {
    /// Loads and validates all three artifacts.
    ///
    /// Width disagreements between the artifacts are logged, not rejected: they
    /// surface as a `DimensionMismatch` on every request instead.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let schema = load_schema(&paths.schema)?;

        let scaler: FittedScaler = read_toml(ArtifactKind::Scaler, &paths.scaler)?;
        scaler
            .validate()
            .map_err(|e: ScaleError| invalid(ArtifactKind::Scaler, &paths.scaler, e))?;
        log::info!(
            "Loaded {:?} scaler over {} columns from {}",
            scaler.kind,
            scaler.expected_length(),
            paths.scaler.display()
        );

        let classifier: KnnClassifier = read_toml(ArtifactKind::Classifier, &paths.classifier)?;
        classifier
            .validate()
            .map_err(|e: ClassifierError| invalid(ArtifactKind::Classifier, &paths.classifier, e))?;
        log::info!(
            "Loaded KNN classifier (k = {}, {} samples, {} features) from {}",
            classifier.n_neighbors,
            classifier.n_samples(),
            classifier.n_features(),
            paths.classifier.display()
        );

        let bundle = Self {
            schema,
            scaler,
            classifier,
        };
        for warning in bundle.consistency_warnings() {
            log::warn!("{warning}");
        }
        Ok(bundle)
    }

    /// Describes every way the artifacts disagree with each other. Empty when they
    /// look like they came from the same training run.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let width = self.schema.len();

        if self.scaler.expected_length() != width {
            warnings.push(format!(
                "Scaler was fitted on {} columns but the schema lists {}; predictions will fail.",
                self.scaler.expected_length(),
                width
            ));
        }
        if self.classifier.n_features() != width {
            warnings.push(format!(
                "Classifier was fitted on {} features but the schema lists {}; predictions will fail.",
                self.classifier.n_features(),
                width
            ));
        }
        if let Some(names) = &self.scaler.feature_names {
            if names.as_slice() != self.schema.columns() {
                warnings.push(
                    "Scaler feature names differ from the column schema; artifacts may come from different training runs."
                        .to_string(),
                );
            }
        }
        warnings
    }

    /// Writes the three artifacts to `paths` in the same TOML format `load` reads.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        write_toml(ArtifactKind::Schema, &paths.schema, &self.schema.to_file())?;
        write_toml(ArtifactKind::Scaler, &paths.scaler, &self.scaler)?;
        write_toml(ArtifactKind::Classifier, &paths.classifier, &self.classifier)?;
        Ok(())
    }
}

/// Loads only the expected column schema.
pub fn load_schema(path: &Path) -> Result<ExpectedColumnSchema, ArtifactError> {
    let schema_file: SchemaFile = read_toml(ArtifactKind::Schema, path)?;
    let schema = ExpectedColumnSchema::try_from(schema_file)
        .map_err(|e: SchemaError| invalid(ArtifactKind::Schema, path, e))?;
    log::info!(
        "Loaded column schema with {} columns from {}",
        schema.len(),
        path.display()
    );
    Ok(schema)
}

fn read_toml<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::MissingArtifact {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ArtifactError::Malformed {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn write_toml<T: Serialize>(kind: ArtifactKind, path: &Path, value: &T) -> Result<(), ArtifactError> {
    let toml_string =
        toml::to_string_pretty(value).map_err(|source| ArtifactError::Serialize { kind, source })?;
    let mut file = BufWriter::new(fs::File::create(path)?);
    file.write_all(toml_string.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn invalid(kind: ArtifactKind, path: &Path, reason: impl fmt::Display) -> ArtifactError {
    ArtifactError::Invalid {
        kind,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{DistanceMetric, NeighborWeights};
    use ndarray::array;

    fn bundle() -> ArtifactBundle {
        ArtifactBundle {
            schema: ExpectedColumnSchema::new(["Age", "Sex_M"]).unwrap(),
            scaler: FittedScaler::identity(2)
                .with_feature_names(vec!["Age".to_string(), "Sex_M".to_string()])
                .unwrap(),
            classifier: KnnClassifier::new(
                array![[0.0, 0.0], [1.0, 1.0]],
                vec![0, 1],
                1,
                NeighborWeights::Uniform,
                DistanceMetric::Euclidean,
            )
            .unwrap(),
        }
    }

    #[test]
    fn default_paths_use_standard_file_names() {
        let paths = ArtifactPaths::in_dir("/models/heart");
        assert_eq!(paths.classifier, Path::new("/models/heart/classifier.toml"));
        assert_eq!(paths.scaler, Path::new("/models/heart/scaler.toml"));
        assert_eq!(paths.schema, Path::new("/models/heart/columns.toml"));
    }

    #[test]
    fn matching_artifacts_produce_no_warnings() {
        assert!(bundle().consistency_warnings().is_empty());
    }

    #[test]
    fn width_skew_is_reported() {
        let mut skewed = bundle();
        skewed.schema = ExpectedColumnSchema::new(["Age", "Sex_M", "Sex_F"]).unwrap();
        let warnings = skewed.consistency_warnings();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("Scaler was fitted on 2 columns"));
        assert!(warnings[1].contains("Classifier was fitted on 2 features"));
    }

    #[test]
    fn missing_files_are_reported_with_their_kind() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactBundle::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
        match err {
            ArtifactError::MissingArtifact { kind, path, .. } => {
                assert_eq!(kind, ArtifactKind::Schema);
                assert_eq!(path, dir.path().join(SCHEMA_FILE_NAME));
            }
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }
}
