#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use env_logger::{Builder, Env};
use itertools::Itertools;
use log::LevelFilter;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use heartrisk::artifacts::{ArtifactBundle, ArtifactPaths, load_schema};
use heartrisk::classify::RiskClassifier;
use heartrisk::pipeline::RiskPipeline;
use heartrisk::record::{ChestPainType, ExerciseAngina, RawPatientRecord, RestingEcg, Sex, StSlope};
use heartrisk::report::render_report;

#[derive(Args)]
pub struct ArtifactArgs {
    /// Directory holding classifier.toml, scaler.toml and columns.toml
    #[arg(long, value_name = "DIR", default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Classifier artifact, overriding the one in --artifacts
    #[arg(long, value_name = "PATH")]
    pub classifier: Option<PathBuf>,

    /// Scaler artifact, overriding the one in --artifacts
    #[arg(long, value_name = "PATH")]
    pub scaler: Option<PathBuf>,

    /// Column schema artifact, overriding the one in --artifacts
    #[arg(long, value_name = "PATH")]
    pub columns: Option<PathBuf>,
}

impl ArtifactArgs {
    fn paths(&self) -> ArtifactPaths {
        let defaults = ArtifactPaths::in_dir(&self.artifacts);
        ArtifactPaths {
            classifier: self.classifier.clone().unwrap_or(defaults.classifier),
            scaler: self.scaler.clone().unwrap_or(defaults.scaler),
            schema: self.columns.clone().unwrap_or(defaults.schema),
        }
    }
}

/// The patient form. Defaults match the values the form starts with.
#[derive(Args)]
pub struct PatientArgs {
    /// Read the patient record from a TOML file keyed by training column names
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Age in years (18-100)
    #[arg(long, default_value_t = 40, conflicts_with = "record")]
    pub age: u32,

    #[arg(long, default_value = "M", conflicts_with = "record",
          value_parser = PossibleValuesParser::new(Sex::KNOWN.iter().copied()))]
    pub sex: String,

    #[arg(long, default_value = "ATA", conflicts_with = "record",
          value_parser = PossibleValuesParser::new(ChestPainType::KNOWN.iter().copied()))]
    pub chest_pain_type: String,

    /// Resting blood pressure in mm Hg (80-200)
    #[arg(long, default_value_t = 120, conflicts_with = "record")]
    pub resting_bp: u32,

    /// Serum cholesterol in mg/dl (100-600)
    #[arg(long, default_value_t = 200, conflicts_with = "record")]
    pub cholesterol: u32,

    /// Fasting blood sugar above 120 mg/dl (0 or 1)
    #[arg(long, default_value_t = 0, conflicts_with = "record")]
    pub fasting_bs: u8,

    #[arg(long, default_value = "Normal", conflicts_with = "record",
          value_parser = PossibleValuesParser::new(RestingEcg::KNOWN.iter().copied()))]
    pub resting_ecg: String,

    /// Maximum heart rate achieved (60-220)
    #[arg(long, default_value_t = 150, conflicts_with = "record")]
    pub max_hr: u32,

    /// Exercise-induced angina
    #[arg(long, default_value = "Y", conflicts_with = "record",
          value_parser = PossibleValuesParser::new(ExerciseAngina::KNOWN.iter().copied()))]
    pub exercise_angina: String,

    /// ST depression induced by exercise relative to rest (0.0-6.0)
    #[arg(long, default_value_t = 1.0, conflicts_with = "record")]
    pub oldpeak: f64,

    #[arg(long, default_value = "Up", conflicts_with = "record",
          value_parser = PossibleValuesParser::new(StSlope::KNOWN.iter().copied()))]
    pub st_slope: String,
}

impl PatientArgs {
    /// Builds the record from a file or the flags, then applies the form's domain checks.
    fn into_record(self) -> Result<RawPatientRecord, Box<dyn std::error::Error>> {
        let record = match &self.record {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                RawPatientRecord::from_toml_str(&text)?
            }
            None => RawPatientRecord {
                age: self.age,
                sex: Sex::from(self.sex),
                chest_pain_type: ChestPainType::from(self.chest_pain_type),
                resting_bp: self.resting_bp,
                cholesterol: self.cholesterol,
                fasting_bs: self.fasting_bs,
                resting_ecg: RestingEcg::from(self.resting_ecg),
                max_hr: self.max_hr,
                exercise_angina: ExerciseAngina::from(self.exercise_angina),
                oldpeak: self.oldpeak,
                st_slope: StSlope::from(self.st_slope),
            },
        };

        record.validate()?;
        for (field, category) in record.unknown_categories() {
            log::warn!(
                "{field} category '{category}' was not seen during training; its indicator column will be ignored"
            );
        }
        Ok(record)
    }
}

#[derive(Parser)]
#[command(
    name = "heartrisk",
    about = "Heart disease risk assessment from a pre-trained nearest-neighbor classifier",
    long_about = "Collects the clinical attributes of one patient, aligns them to the feature \
                 columns the model was trained on, scales them and reports the predicted risk. \
                 For educational purposes only; not a medical diagnosis."
)]
struct Cli {
    /// Increase log output (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict heart disease risk for one patient
    #[command(about = "Predict heart disease risk for one patient")]
    Predict {
        #[command(flatten)]
        patient: PatientArgs,

        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Show the aligned and scaled feature vectors for one patient
    #[command(about = "Show the model-ready feature vectors for one patient")]
    Encode {
        #[command(flatten)]
        patient: PatientArgs,

        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// List the feature columns the model expects, in order
    #[command(about = "List the expected feature columns")]
    Columns {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

fn main() {
    let cli = Cli::parse();
    let Cli { verbose, command } = cli;
    init_logging(verbose);

    let result = match command {
        Some(Commands::Predict { patient, artifacts }) => run_predict(patient, &artifacts),
        Some(Commands::Encode { patient, artifacts }) => run_encode(patient, &artifacts),
        Some(Commands::Columns { artifacts }) => run_columns(&artifacts),
        Some(Commands::Version) => {
            println!("heartrisk {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    Builder::new()
        .filter_level(level)
        .parse_env(Env::default())
        .init();
}

fn load_pipeline(artifacts: &ArtifactArgs) -> Result<RiskPipeline, Box<dyn std::error::Error>> {
    let bundle = ArtifactBundle::load(&artifacts.paths())?;
    Ok(RiskPipeline::from(bundle))
}

fn run_predict(
    patient: PatientArgs,
    artifacts: &ArtifactArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = patient.into_record()?;
    let pipeline = load_pipeline(artifacts)?;
    let result = pipeline.assess(&record)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_report(&mut out, &record, pipeline.classifier().name(), &result)?;
    out.flush()?;
    Ok(())
}

fn run_encode(
    patient: PatientArgs,
    artifacts: &ArtifactArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = patient.into_record()?;
    let pipeline = load_pipeline(artifacts)?;
    let prepared = pipeline.prepare(&record)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{:<24}\t{:>12}\t{:>12}", "column", "aligned", "scaled")?;
    for ((column, aligned), scaled) in pipeline
        .schema()
        .iter()
        .zip(prepared.encoding.vector.iter())
        .zip(prepared.scaled.iter())
    {
        writeln!(out, "{column:<24}\t{aligned:>12.4}\t{scaled:>12.4}")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Dropped columns: {}",
        describe_columns(&prepared.encoding.dropped_columns)
    )?;
    writeln!(
        out,
        "Defaulted to zero: {}",
        describe_columns(&prepared.encoding.defaulted_columns)
    )?;
    out.flush()?;
    Ok(())
}

fn run_columns(artifacts: &ArtifactArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(&artifacts.paths().schema)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (idx, column) in schema.iter().enumerate() {
        writeln!(out, "{idx}\t{column}")?;
    }
    out.flush()?;
    Ok(())
}

fn describe_columns(columns: &[String]) -> String {
    if columns.is_empty() {
        "(none)".to_string()
    } else {
        columns.iter().join(", ")
    }
}
