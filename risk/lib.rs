#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod artifacts;
pub mod classify;
pub mod encode;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod scale;
pub mod schema;
pub mod types;

pub use artifacts::{ArtifactBundle, ArtifactError, ArtifactPaths};
pub use classify::{KnnClassifier, RiskClassifier, RiskLabel};
pub use encode::{encode, one_hot_column};
pub use pipeline::{PipelineError, RiskPipeline, assess};
pub use record::RawPatientRecord;
pub use report::PredictionResult;
pub use scale::{FittedScaler, normalize};
pub use schema::ExpectedColumnSchema;
pub use types::{AlignedFeatureVector, ScaledFeatureVector};
