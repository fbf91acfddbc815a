//! Output formatter trait

use pitfall_domain::Report;

/// Trait for rendering analysis reports
pub trait ReportFormatter {
    /// Render conflicts at or above `min_confidence`
    fn format(&self, report: &Report, min_confidence: f64) -> String;
}

/// Serialized report; the filter does not apply, every conflict is kept
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_report(report: &Report) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report, _min_confidence: f64) -> String {
        Self::format_report(report)
    }
}
