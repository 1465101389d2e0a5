//! Markdown summaries posted as pull request comments.
//!
//! The diff blocks are fixed width (41 columns) and rendered inside a fenced
//! code block, so every pad below is part of the output contract.

use crate::reports::{CoverageReport, QualityReport};
use crate::standard::StandardReport;

/// Marker identifying the guidelines comment among a PR's comments.
pub const STANDARD_MARKER: &str = "Guidelines Report";
/// Markers identifying the coverage/quality comment.
pub const QUALITY_MARKERS: [&str; 2] = ["Coverage Diff", "Quality Diff"];

const NAME_WIDTH: usize = 33;
const ELLIPSIS: &str = "...";

const STANDARD_SUMMARY: &str = "
## Guidelines Report

```diff
@@         FineTune Guidelines        @@
========================================
+ Item    Message
========================================
#CONTENT_PLACEHOLDER#
========================================
#RESUME_PLACEHOLDER#
```

Read the [docs](#DOCS#) for more details
";

const COVERAGE_REPORT: &str = "
## Coverage Report

> Comparing to #TARGET_BRANCH#

```diff
@@            Coverage Diff            @@
=========================================
+ Files                         Coverage
=========================================
#CONTENT_PLACEHOLDER#
=========================================
#RESUME_PLACEHOLDER#
```

#FOOTER#
";

const QUALITY_REPORT: &str = "
## Quality Report

> Comparing to #TARGET_BRANCH#

```diff
@@            Quality  Diff            @@
=========================================
+ Files                          Quality
=========================================
#CONTENT_PLACEHOLDER#
=========================================
#RESUME_PLACEHOLDER#
```

#FOOTER#
";

const COVERAGE_FOOTER: &str = "See details in the [**coverage report**](#COV_LINK#).";
const QUALITY_FOOTER: &str = "See details in the [**quality report**](#QUALITY_LINK#).";

/// Cuts `text` from the left so it fits in `width` characters, keeping the
/// tail (the file name) and prefixing an ellipsis.
pub fn truncate_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let tail: String = text.chars().skip(len - keep).collect();
    format!("{ELLIPSIS}{tail}")
}

/// Right-justify to `right`, then left-justify to `total`.
fn pad_value(value: &str, right: usize, total: usize) -> String {
    format!("{:<total$}", format!("{:>right$}", value))
}

fn render_row(name: &str, value: &str) -> String {
    format!(
        "{:<NAME_WIDTH$}{}",
        truncate_left(name, NAME_WIDTH),
        pad_value(value, 7, 8)
    )
}

fn render_report<'a>(
    template: &str,
    target_branch: &str,
    rows: impl Iterator<Item = (&'a str, &'a str)>,
    resume: &str,
    footer: &str,
) -> String {
    let content: Vec<String> = rows.map(|(name, value)| render_row(name, value)).collect();

    template
        .replace("#TARGET_BRANCH#", target_branch)
        .replace("#FOOTER#", footer)
        .replace("#CONTENT_PLACEHOLDER#", &content.join("\n"))
        .replace("#RESUME_PLACEHOLDER#", resume)
        .trim()
        .to_string()
}

pub fn create_coverage_summary(report: Option<&CoverageReport>, footer: &str) -> String {
    let Some(report) = report else {
        return String::new();
    };

    let resume = format!(
        "+ Covered lines{}\n- Missing lines{}\n+ Coverage{}",
        pad_value(&report.total, 25, 26),
        pad_value(&report.missing, 25, 26),
        pad_value(&report.coverage, 30, 31),
    );
    let rows = report
        .files
        .iter()
        .map(|f| (f.file.as_str(), f.value.as_str()));

    render_report(COVERAGE_REPORT, &report.target_branch, rows, &resume, footer)
}

pub fn create_quality_summary(report: Option<&QualityReport>, footer: &str) -> String {
    let Some(report) = report else {
        return String::new();
    };

    let resume = format!(
        "+ Total lines{}\n- Violation lines{}\n+ Quality{}",
        pad_value(&report.total, 27, 28),
        pad_value(&report.violations, 23, 24),
        pad_value(&report.quality, 31, 32),
    );
    let rows = report
        .files
        .iter()
        .map(|f| (f.file.as_str(), f.value.as_str()));

    render_report(QUALITY_REPORT, &report.target_branch, rows, &resume, footer)
}

pub fn create_coverage_footer(link: &str) -> String {
    COVERAGE_FOOTER.replace("#COV_LINK#", link)
}

pub fn create_quality_footer(link: &str) -> String {
    QUALITY_FOOTER.replace("#QUALITY_LINK#", link)
}

fn sign(standard: bool) -> char {
    if standard { '+' } else { '-' }
}

/// Renders the guidelines comment: one row for the title, one per commit.
pub fn create_standard_summary(report: &StandardReport, resume: &str, docs_link: &str) -> String {
    let mut content = vec![format!(
        "{} TITLE   {}",
        sign(report.title.standard),
        report.title.message
    )];

    for commit in &report.commits {
        let sha: String = commit.sha.chars().take(7).collect();
        let subject = commit.message.lines().next().unwrap_or_default();
        content.push(format!("{} {} {}", sign(commit.standard), sha, subject));
    }

    STANDARD_SUMMARY
        .replace("#CONTENT_PLACEHOLDER#", &content.join("\n"))
        .replace("#DOCS#", docs_link)
        .replace("#RESUME_PLACEHOLDER#", resume)
        .trim()
        .to_string()
}

/// Comment body for the coverage + quality summary, or `None` when both
/// reports are absent.
pub fn create_quality_comment(
    coverage: Option<&CoverageReport>,
    quality: Option<&QualityReport>,
    coverage_footer: &str,
    quality_footer: &str,
) -> Option<String> {
    if coverage.is_none() && quality.is_none() {
        return None;
    }
    Some(format!(
        "{}\n{}",
        create_coverage_summary(coverage, coverage_footer),
        create_quality_summary(quality, quality_footer)
    ))
}
