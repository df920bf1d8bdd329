//! Prediction results and their human-readable rendering.

use crate::classify::RiskLabel;
use crate::record::RawPatientRecord;
use std::io::{self, Write};

/// Width of the text progress bar showing the risk probability.
pub const PROGRESS_BAR_WIDTH: usize = 30;

/// Outcome of one inference request. Built once per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Probability of the high-risk class, in `[0, 1]`.
    pub probability: f64,
}

impl PredictionResult {
    pub fn headline(&self) -> &'static str {
        match self.label {
            RiskLabel::HighRisk => "High Risk of Heart Disease",
            RiskLabel::LowRisk => "Low Risk of Heart Disease",
        }
    }

    /// The probability as a percentage with two decimals, e.g. `81.00%`.
    pub fn probability_percent(&self) -> String {
        format_percentage(self.probability)
    }
}

pub fn format_percentage(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// `[#####-----]`-style bar, `width` cells wide, filled in proportion to `fraction`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.extend(std::iter::repeat_n('#', filled));
    bar.extend(std::iter::repeat_n('-', width - filled));
    bar.push(']');
    bar
}

/// Writes the full assessment: patient overview, model information and the result.
pub fn render_report<W: Write>(
    out: &mut W,
    record: &RawPatientRecord,
    model_name: &str,
    result: &PredictionResult,
) -> io::Result<()> {
    writeln!(out, "Heart Disease Risk Predictor")?;
    writeln!(out, "Machine learning powered risk assessment ({model_name})")?;
    writeln!(out)?;

    writeln!(out, "Patient Overview")?;
    writeln!(out, "  {:<14} {}", "Age", record.age)?;
    writeln!(out, "  {:<14} {}", "Resting BP", record.resting_bp)?;
    writeln!(out, "  {:<14} {}", "Cholesterol", record.cholesterol)?;
    writeln!(out)?;

    writeln!(out, "Model Information")?;
    writeln!(out, "  {:<14} {}", "Model Used", model_name)?;
    writeln!(out, "  {:<14} {}", "Status", "Active")?;
    writeln!(out)?;

    writeln!(out, "Prediction Result")?;
    writeln!(out, "  {}", result.headline())?;
    writeln!(out, "  {}", progress_bar(result.probability, PROGRESS_BAR_WIDTH))?;
    writeln!(out, "  Risk Probability: {}", result.probability_percent())?;
    writeln!(out)?;

    writeln!(
        out,
        "This tool is for educational purposes only and not a medical diagnosis."
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_risk_result_reads_high_risk_with_two_decimals() {
        let result = PredictionResult {
            label: RiskLabel::from_class(1).unwrap(),
            probability: 0.81,
        };
        assert_eq!(result.label.to_string(), "High Risk");
        assert_eq!(result.headline(), "High Risk of Heart Disease");
        assert_eq!(result.probability_percent(), "81.00%");
    }

    #[test]
    fn low_risk_result_reads_low_risk_with_two_decimals() {
        let result = PredictionResult {
            label: RiskLabel::from_class(0).unwrap(),
            probability: 0.12,
        };
        assert_eq!(result.label.to_string(), "Low Risk");
        assert_eq!(result.headline(), "Low Risk of Heart Disease");
        assert_eq!(result.probability_percent(), "12.00%");
    }

    #[test]
    fn percentages_use_two_decimals() {
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
        assert_eq!(format_percentage(2.0 / 3.0), "66.67%");
    }

    #[test]
    fn progress_bar_fills_in_proportion() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(1.0, 4), "[####]");
        assert_eq!(progress_bar(1.7, 4), "[####]");
        assert_eq!(progress_bar(f64::NAN, 4), "[----]");
    }

    #[test]
    fn report_contains_overview_and_result() {
        let record = RawPatientRecord::default();
        let result = PredictionResult {
            label: RiskLabel::HighRisk,
            probability: 0.81,
        };
        let mut out = Vec::new();
        render_report(&mut out, &record, "KNN", &result).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Age            40"));
        assert!(text.contains("Model Used     KNN"));
        assert!(text.contains("High Risk of Heart Disease"));
        assert!(text.contains("Risk Probability: 81.00%"));
    }
}
