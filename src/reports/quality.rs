use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use super::capture_field;
use crate::error::{HooksError, Result};

/// Sentinel printed by diff-quality when the diff touches no linted lines.
pub const QUALITY_EMPTY_TEXT: &str = "No lines with quality information in this diff.";

static TARGET_BRANCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Diff: (.*)\.\.\.").unwrap());
static TOTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Total: (.*) line").unwrap());
static VIOLATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Violations: (.*) line").unwrap());
static QUALITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Quality: (.*)").unwrap());
static FILE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.*) \(([\d.]+%)\)").unwrap());

static FLAKE8_ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.*):(\d+): ([A-Z]\d+) (.*)$").unwrap());
static ESLINT_ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.*):(\d+): (.*) - (.*)$").unwrap());

/// Lint tools whose diff-quality output we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTool {
    #[default]
    Flake8,
    Eslint,
}

type IssueParser = fn(&str) -> Vec<QualityIssue>;

/// Header marker and issue parser for every known tool.
const QUALITY_TOOLS: [(QualityTool, &str, IssueParser); 2] = [
    (QualityTool::Flake8, "Quality Report: flake8", parse_flake8_issues),
    (QualityTool::Eslint, "Quality Report: eslint", parse_eslint_issues),
];

impl QualityTool {
    /// Picks the tool from the `Quality Report: <tool>` header marker.
    pub fn detect(content: &str) -> Result<Self> {
        QUALITY_TOOLS
            .iter()
            .find(|(_, marker, _)| content.contains(marker))
            .map(|(tool, _, _)| *tool)
            .ok_or(HooksError::UnknownQualityTool)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTool::Flake8 => "flake8",
            QualityTool::Eslint => "eslint",
        }
    }

    /// Name of the HTML artifact the CI job publishes for this tool.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            QualityTool::Flake8 => "flake8.html",
            QualityTool::Eslint => "eslint.html",
        }
    }

    fn issue_parser(&self) -> IssueParser {
        QUALITY_TOOLS
            .iter()
            .find(|(tool, _, _)| tool == self)
            .map(|(_, _, parser)| *parser)
            .unwrap_or(parse_flake8_issues)
    }
}

impl fmt::Display for QualityTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityTool {
    type Err = HooksError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flake8" => Ok(QualityTool::Flake8),
            "eslint" => Ok(QualityTool::Eslint),
            _ => Err(HooksError::UnknownQualityTool),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub file: String,
    pub line: String,
    pub error_code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFile {
    pub file: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub target_branch: String,
    pub total: String,
    pub violations: String,
    pub quality: String,
    pub issues: Vec<QualityIssue>,
    pub files: Vec<QualityFile>,
}

/// Outcome of reading a quality artifact: the report (if any) and the tool
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRead {
    pub report: Option<QualityReport>,
    pub tool: QualityTool,
}

fn issues_from(pattern: &Regex, content: &str) -> Vec<QualityIssue> {
    pattern
        .captures_iter(content)
        .map(|caps| QualityIssue {
            file: caps[1].to_string(),
            line: caps[2].to_string(),
            error_code: caps[3].to_string(),
            description: caps[4].trim_end().to_string(),
        })
        .collect()
}

fn parse_flake8_issues(content: &str) -> Vec<QualityIssue> {
    issues_from(&FLAKE8_ISSUE, content)
}

fn parse_eslint_issues(content: &str) -> Vec<QualityIssue> {
    issues_from(&ESLINT_ISSUE, content)
}

/// Builds a quality report from a diff-quality text artifact.
///
/// The tool marker is checked before the empty sentinel, so an artifact from
/// an unknown tool is an error even when it reports nothing. Missing content
/// reads as an empty flake8 report.
pub fn read_quality(content: Option<&str>) -> Result<QualityRead> {
    let content = match content {
        Some(c) if !c.is_empty() => c,
        _ => {
            return Ok(QualityRead {
                report: None,
                tool: QualityTool::default(),
            });
        }
    };

    let tool = QualityTool::detect(content)?;
    if content.contains(QUALITY_EMPTY_TEXT) {
        return Ok(QualityRead { report: None, tool });
    }

    let files = FILE_LINE
        .captures_iter(content)
        .map(|caps| QualityFile {
            file: caps[1].to_string(),
            value: caps[2].to_string(),
        })
        .collect();

    let report = QualityReport {
        target_branch: capture_field(&TARGET_BRANCH, content, "target_branch")?,
        total: capture_field(&TOTAL, content, "total")?,
        violations: capture_field(&VIOLATIONS, content, "violations")?,
        quality: capture_field(&QUALITY, content, "quality")?,
        issues: tool.issue_parser()(content),
        files,
    };

    Ok(QualityRead {
        report: Some(report),
        tool,
    })
}
