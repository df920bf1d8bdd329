//! # Patient Record
//!
//! The typed form of the eleven clinical fields collected for one patient.
//!
//! - Categorical fields are enums with one variant per category seen at training
//!   time plus an `Other` variant holding any unseen category verbatim. Parsing a
//!   category never fails; whether an unseen category matters is decided by the
//!   encoder (it is silently dropped there).
//! - Domain checks (`validate`) belong to whoever collects the record. The
//!   encoder never applies them.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The clinical fields of a patient record, named as they appear in training columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClinicalField {
    Age,
    Sex,
    ChestPainType,
    RestingBp,
    Cholesterol,
    FastingBs,
    RestingEcg,
    MaxHr,
    ExerciseAngina,
    Oldpeak,
    StSlope,
}

impl ClinicalField {
    pub const ALL: [ClinicalField; 11] = [
        ClinicalField::Age,
        ClinicalField::Sex,
        ClinicalField::ChestPainType,
        ClinicalField::RestingBp,
        ClinicalField::Cholesterol,
        ClinicalField::FastingBs,
        ClinicalField::RestingEcg,
        ClinicalField::MaxHr,
        ClinicalField::ExerciseAngina,
        ClinicalField::Oldpeak,
        ClinicalField::StSlope,
    ];

    /// Fields passed through to the vector under their own column name.
    pub const NUMERIC: [ClinicalField; 6] = [
        ClinicalField::Age,
        ClinicalField::RestingBp,
        ClinicalField::Cholesterol,
        ClinicalField::FastingBs,
        ClinicalField::MaxHr,
        ClinicalField::Oldpeak,
    ];

    /// Fields expanded into one-hot indicator columns.
    pub const CATEGORICAL: [ClinicalField; 5] = [
        ClinicalField::Sex,
        ClinicalField::ChestPainType,
        ClinicalField::RestingEcg,
        ClinicalField::ExerciseAngina,
        ClinicalField::StSlope,
    ];

    /// Column name used by the training data. One-hot columns use it as their prefix.
    pub fn column_name(self) -> &'static str {
        match self {
            ClinicalField::Age => "Age",
            ClinicalField::Sex => "Sex",
            ClinicalField::ChestPainType => "ChestPainType",
            ClinicalField::RestingBp => "RestingBP",
            ClinicalField::Cholesterol => "Cholesterol",
            ClinicalField::FastingBs => "FastingBS",
            ClinicalField::RestingEcg => "RestingECG",
            ClinicalField::MaxHr => "MaxHR",
            ClinicalField::ExerciseAngina => "ExerciseAngina",
            ClinicalField::Oldpeak => "Oldpeak",
            ClinicalField::StSlope => "ST_Slope",
        }
    }

    pub fn is_categorical(self) -> bool {
        Self::CATEGORICAL.contains(&self)
    }

    /// Inclusive domain accepted by the input form for numeric fields.
    pub fn domain(self) -> Option<(f64, f64)> {
        match self {
            ClinicalField::Age => Some((18.0, 100.0)),
            ClinicalField::RestingBp => Some((80.0, 200.0)),
            ClinicalField::Cholesterol => Some((100.0, 600.0)),
            ClinicalField::FastingBs => Some((0.0, 1.0)),
            ClinicalField::MaxHr => Some((60.0, 220.0)),
            ClinicalField::Oldpeak => Some((0.0, 6.0)),
            _ => None,
        }
    }
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

macro_rules! categorical_field {
    (
        $(#[$meta:meta])*
        $name:ident => $field:expr,
        { $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A category outside the training vocabulary, kept verbatim.
            Other(String),
        }

        impl $name {
            pub const FIELD: ClinicalField = $field;

            /// Categories known at training time, in form order.
            pub const KNOWN: &'static [&'static str] = &[$($token),+];

            pub fn category(&self) -> &str {
                match self {
                    $(Self::$variant => $token,)+
                    Self::Other(raw) => raw.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $($token => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::from(raw.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(raw) => raw,
                    known => known.category().to_string(),
                }
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.category())
            }
        }
    };
}

categorical_field! {
    Sex => ClinicalField::Sex,
    {
        Male => "M",
        Female => "F",
    }
}

categorical_field! {
    ChestPainType => ClinicalField::ChestPainType,
    {
        AtypicalAngina => "ATA",
        NonAnginalPain => "NAP",
        TypicalAngina => "TA",
        Asymptomatic => "ASY",
    }
}

categorical_field! {
    /// Resting electrocardiogram result.
    RestingEcg => ClinicalField::RestingEcg,
    {
        Normal => "Normal",
        /// ST-T wave abnormality.
        StAbnormality => "ST",
        /// Left ventricular hypertrophy.
        LeftVentricularHypertrophy => "LVH",
    }
}

categorical_field! {
    ExerciseAngina => ClinicalField::ExerciseAngina,
    {
        Yes => "Y",
        No => "N",
    }
}

categorical_field! {
    /// Slope of the peak exercise ST segment.
    StSlope => ClinicalField::StSlope,
    {
        Up => "Up",
        Flat => "Flat",
        Down => "Down",
    }
}

/// One raw field value as handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawFeature<'a> {
    Numeric { field: ClinicalField, value: f64 },
    Categorical { field: ClinicalField, category: &'a str },
}

impl RawFeature<'_> {
    pub fn field(&self) -> ClinicalField {
        match self {
            RawFeature::Numeric { field, .. } | RawFeature::Categorical { field, .. } => *field,
        }
    }
}

/// Clinical attributes for one inference request. Built fresh, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPatientRecord {
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Sex")]
    pub sex: Sex,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: ChestPainType,
    #[serde(rename = "RestingBP")]
    pub resting_bp: u32,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: u32,
    /// Fasting blood sugar above 120 mg/dl: 0 or 1.
    #[serde(rename = "FastingBS")]
    pub fasting_bs: u8,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    pub max_hr: u32,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: StSlope,
}

/// A field value outside the domain the input form accepts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainViolation {
    #[error("{field} = {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange {
        field: ClinicalField,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} = {value} must be 0 or 1")]
    NotBinary { field: ClinicalField, value: u8 },
    #[error("{field} = {value} is not a finite number")]
    NotFinite { field: ClinicalField, value: f64 },
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Patient record failed validation: {}", .0.iter().join("; "))]
    Invalid(Vec<DomainViolation>),
    #[error("Failed to parse patient record: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RawPatientRecord {
    /// Raw features in form order: numeric pass-through fields first, then categorical.
    pub fn features(&self) -> [RawFeature<'_>; 11] {
        [
            RawFeature::Numeric {
                field: ClinicalField::Age,
                value: f64::from(self.age),
            },
            RawFeature::Numeric {
                field: ClinicalField::RestingBp,
                value: f64::from(self.resting_bp),
            },
            RawFeature::Numeric {
                field: ClinicalField::Cholesterol,
                value: f64::from(self.cholesterol),
            },
            RawFeature::Numeric {
                field: ClinicalField::FastingBs,
                value: f64::from(self.fasting_bs),
            },
            RawFeature::Numeric {
                field: ClinicalField::MaxHr,
                value: f64::from(self.max_hr),
            },
            RawFeature::Numeric {
                field: ClinicalField::Oldpeak,
                value: self.oldpeak,
            },
            RawFeature::Categorical {
                field: Sex::FIELD,
                category: self.sex.category(),
            },
            RawFeature::Categorical {
                field: ChestPainType::FIELD,
                category: self.chest_pain_type.category(),
            },
            RawFeature::Categorical {
                field: RestingEcg::FIELD,
                category: self.resting_ecg.category(),
            },
            RawFeature::Categorical {
                field: ExerciseAngina::FIELD,
                category: self.exercise_angina.category(),
            },
            RawFeature::Categorical {
                field: StSlope::FIELD,
                category: self.st_slope.category(),
            },
        ]
    }

    /// Parses a record from TOML using the training column names as keys.
    pub fn from_toml_str(text: &str) -> Result<Self, RecordError> {
        Ok(toml::from_str(text)?)
    }

    /// Checks every numeric field against the form's domain and reports all violations.
    ///
    /// Unseen categories are not violations; see [`RawPatientRecord::unknown_categories`].
    pub fn validate(&self) -> Result<(), RecordError> {
        let mut violations = Vec::new();

        if self.fasting_bs > 1 {
            violations.push(DomainViolation::NotBinary {
                field: ClinicalField::FastingBs,
                value: self.fasting_bs,
            });
        }

        for feature in self.features() {
            let RawFeature::Numeric { field, value } = feature else {
                continue;
            };
            if field == ClinicalField::FastingBs {
                continue;
            }
            if !value.is_finite() {
                violations.push(DomainViolation::NotFinite { field, value });
                continue;
            }
            if let Some((min, max)) = field.domain() {
                if value < min || value > max {
                    violations.push(DomainViolation::OutOfRange {
                        field,
                        value,
                        min,
                        max,
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Invalid(violations))
        }
    }

    /// Categorical fields whose value was not part of the training vocabulary.
    pub fn unknown_categories(&self) -> Vec<(ClinicalField, &str)> {
        let mut unknown = Vec::new();
        if !self.sex.is_known() {
            unknown.push((Sex::FIELD, self.sex.category()));
        }
        if !self.chest_pain_type.is_known() {
            unknown.push((ChestPainType::FIELD, self.chest_pain_type.category()));
        }
        if !self.resting_ecg.is_known() {
            unknown.push((RestingEcg::FIELD, self.resting_ecg.category()));
        }
        if !self.exercise_angina.is_known() {
            unknown.push((ExerciseAngina::FIELD, self.exercise_angina.category()));
        }
        if !self.st_slope.is_known() {
            unknown.push((StSlope::FIELD, self.st_slope.category()));
        }
        unknown
    }
}

impl Default for RawPatientRecord {
    /// The values the input form starts with before the user touches it.
    fn default() -> Self {
        Self {
            age: 40,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::AtypicalAngina,
            resting_bp: 120,
            cholesterol: 200,
            fasting_bs: 0,
            resting_ecg: RestingEcg::Normal,
            max_hr: 150,
            exercise_angina: ExerciseAngina::Yes,
            oldpeak: 1.0,
            st_slope: StSlope::Up,
        }
    }
}
