//! Structured views of diff-cover / diff-quality text reports
//!
//! Each reader turns one raw text artifact into a report, or `None` when the
//! artifact is missing or the tool found nothing to report on.

pub mod coverage;
pub mod quality;

use regex::Regex;

use crate::error::{HooksError, Result};

pub use coverage::{COVERAGE_EMPTY_TEXT, CoverageFile, CoverageReport, read_coverage};
pub use quality::{
    QUALITY_EMPTY_TEXT, QualityFile, QualityIssue, QualityRead, QualityReport, QualityTool,
    read_quality,
};

/// Returns the first capture group of `pattern` in `content`, trimmed.
fn capture_field(pattern: &Regex, content: &str, field: &'static str) -> Result<String> {
    pattern
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or(HooksError::MalformedReport(field))
}
