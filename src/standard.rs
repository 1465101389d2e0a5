//! Ticketing convention for pull request titles and commit messages

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::error::Result;
use crate::github::PullRequestCommit;

/// Allow-patterns tried in order; the first match makes a message standard.
pub const DEFAULT_PATTERNS: [&str; 5] = [
    r"^\w+-\d+",
    r"^NO-TICKET",
    r"^\[shepherd\]",
    r"^Merge",
    r"Release \d{8}",
];

pub const SUCCESS_MESSAGE: &str = "Your PR title and commits are ok!";
pub const PR_TITLE_FAILURE_MESSAGE: &str =
    "Your PR title should start with NO-TICKET or a ticket id";
pub const PR_COMMITS_FAILURE_MESSAGE: &str = "Some commit messages do not follow the standard";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleCheck {
    pub message: String,
    pub standard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitCheck {
    pub sha: String,
    pub message: String,
    pub standard: bool,
}

/// Per-item result of a validation run, rendered into the guidelines comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardReport {
    pub title: TitleCheck,
    pub commits: Vec<CommitCheck>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardVerdict {
    pub valid: bool,
    pub reason: &'static str,
    pub report: StandardReport,
}

#[derive(Debug, Clone)]
pub struct StandardRules {
    patterns: Vec<Regex>,
}

impl StandardRules {
    /// Compiles the given patterns, keeping their order.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_standard(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(message))
    }

    /// Checks every commit; the overall flag is false if any commit fails.
    pub fn validate_commits(&self, commits: &[PullRequestCommit]) -> (bool, Vec<CommitCheck>) {
        let checks: Vec<CommitCheck> = commits
            .iter()
            .map(|c| CommitCheck {
                sha: c.sha.clone(),
                message: c.commit.message.clone(),
                standard: self.is_standard(&c.commit.message),
            })
            .collect();
        let valid = checks.iter().all(|c| c.standard);
        (valid, checks)
    }

    /// Title first, then commits. The reason names the first kind of failure.
    pub fn validate_pr(&self, title: &str, commits: &[PullRequestCommit]) -> StandardVerdict {
        let title_ok = self.is_standard(title);
        let (commits_ok, checks) = self.validate_commits(commits);

        let (valid, reason) = match (title_ok, commits_ok) {
            (false, _) => (false, PR_TITLE_FAILURE_MESSAGE),
            (true, false) => (false, PR_COMMITS_FAILURE_MESSAGE),
            (true, true) => (true, SUCCESS_MESSAGE),
        };

        StandardVerdict {
            valid,
            reason,
            report: StandardReport {
                title: TitleCheck {
                    message: title.to_string(),
                    standard: title_ok,
                },
                commits: checks,
            },
        }
    }
}

static DEFAULT_RULES: LazyLock<StandardRules> =
    LazyLock::new(|| StandardRules::new(&DEFAULT_PATTERNS).unwrap());

impl Default for StandardRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}
