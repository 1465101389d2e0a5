use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::capture_field;
use crate::error::Result;

/// Sentinel printed by diff-cover when the diff touches no measured lines.
pub const COVERAGE_EMPTY_TEXT: &str = "No lines with coverage information in this diff.";

static TARGET_BRANCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Diff: (.*)\.\.\.").unwrap());
static TOTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Total: (.*) line").unwrap());
static MISSING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Missing: (.*) line").unwrap());
static COVERAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Coverage: (.*)").unwrap());
static FILE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.*) \(([\d.]+%)\)(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageFile {
    pub file: String,
    pub value: String,
    /// Raw "missing lines" suffix, e.g. `: Missing lines 24-25`
    pub missing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub target_branch: String,
    pub total: String,
    pub missing: String,
    pub coverage: String,
    pub files: Vec<CoverageFile>,
}

/// Builds a coverage report from a diff-cover text artifact.
///
/// `None` content and the empty sentinel both yield `Ok(None)`. Content that
/// lacks one of the summary fields is a malformed report.
pub fn read_coverage(content: Option<&str>) -> Result<Option<CoverageReport>> {
    let content = match content {
        Some(c) if !c.is_empty() && !c.contains(COVERAGE_EMPTY_TEXT) => c,
        _ => return Ok(None),
    };

    let files = FILE_LINE
        .captures_iter(content)
        .map(|caps| {
            let missing = caps[3].trim_end();
            CoverageFile {
                file: caps[1].to_string(),
                value: caps[2].to_string(),
                missing: (!missing.is_empty()).then(|| missing.to_string()),
            }
        })
        .collect();

    Ok(Some(CoverageReport {
        target_branch: capture_field(&TARGET_BRANCH, content, "target_branch")?,
        total: capture_field(&TOTAL, content, "total")?,
        missing: capture_field(&MISSING, content, "missing")?,
        coverage: capture_field(&COVERAGE, content, "coverage")?,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HooksError;

    const COVDIFF: &str = "\
-------------
Diff Coverage
Diff: origin/dev...HEAD, staged and unstaged changes
-------------
example/worker/feedback/models.py (60.0%): Missing lines 24-25
example/schemas/subjects.py (25.0%): Missing lines 10,12-14
example/api/views.py (100%)
-------------
Total:   85 lines
Missing: 72 lines
Coverage: 15%
-------------
";

    #[test]
    fn reads_summary_fields_as_strings() {
        let report = read_coverage(Some(COVDIFF)).unwrap().unwrap();
        assert_eq!(report.target_branch, "origin/dev");
        assert_eq!(report.total, "85");
        assert_eq!(report.missing, "72");
        assert_eq!(report.coverage, "15%");
    }

    #[test]
    fn reads_file_lines_in_order() {
        let report = read_coverage(Some(COVDIFF)).unwrap().unwrap();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.files[0].file, "example/worker/feedback/models.py");
        assert_eq!(report.files[0].value, "60.0%");
        assert_eq!(
            report.files[0].missing.as_deref(),
            Some(": Missing lines 24-25")
        );
        assert_eq!(report.files[2].file, "example/api/views.py");
        assert_eq!(report.files[2].missing, None);
    }

    #[test]
    fn empty_sentinel_means_no_report() {
        let content = format!(
            "-------------\nDiff Coverage\nDiff: origin/dev...HEAD\n-------------\n{}\n-------------\n",
            COVERAGE_EMPTY_TEXT
        );
        assert_eq!(read_coverage(Some(&content)).unwrap(), None);
    }

    #[test]
    fn missing_content_means_no_report() {
        assert_eq!(read_coverage(None).unwrap(), None);
        assert_eq!(read_coverage(Some("")).unwrap(), None);
    }

    #[test]
    fn content_without_summary_is_malformed() {
        let err = read_coverage(Some("Diff Coverage\nsomething else\n")).unwrap_err();
        assert!(matches!(err, HooksError::MalformedReport("target_branch")));
    }
}
