//! Inbound payload structures

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use crate::circleci::CircleCommit;
use crate::error::{HooksError, Result};
use crate::reports::QualityTool;

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub statuses_url: String,
    pub comments_url: String,
    pub commits_url: String,
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
}

/// GitHub `pull_request` webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

/// Callback posted by the CI job once reports are uploaded.
#[derive(Debug, Clone, Deserialize)]
pub struct CiEvent {
    pub commit_sha: String,
    pub owner: String,
    pub project: String,
    #[serde(deserialize_with = "string_or_number")]
    pub build_num: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub pr_link: Option<String>,
}

impl CiEvent {
    pub fn circle_commit(&self, quality_tool: QualityTool) -> CircleCommit {
        CircleCommit {
            owner: self.owner.clone(),
            project: self.project.clone(),
            commit_sha: self.commit_sha.clone(),
            build_num: self.build_num.clone(),
            quality_tool,
            repo_id: None,
        }
    }
}

/// CI scripts send the build number either quoted or bare.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

fn non_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Parts of a pull request html link: `https://github.com/:owner/:repo/pull/:number`
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestLink {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestLink {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || HooksError::InvalidPayload(format!("not a pull request link: {}", raw));
        let path = raw
            .split_once("github.com/")
            .map(|(_, path)| path)
            .ok_or_else(invalid)?;
        let mut parts = path.trim_end_matches('/').split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), Some("pull"), Some(number))
                if !owner.is_empty() && !repo.is_empty() =>
            {
                let number = number.parse().map_err(|_| invalid())?;
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    number,
                })
            }
            _ => Err(invalid()),
        }
    }

    pub fn comments_url(&self, api_url: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.number
        )
    }

    pub fn statuses_url(&self, api_url: &str, commit_sha: &str) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            commit_sha
        )
    }
}

/// A chat slash-command, e.g. `/codefreeze enable Jan 20`
#[derive(Debug, Clone, PartialEq)]
pub struct SlashCommand {
    pub user_name: String,
    pub channel_name: String,
    pub command: String,
    /// First word of the command text
    pub text: String,
    /// Remaining words of the command text
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let field = |key: &str| form.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let raw_text = field("text");
        let mut words = raw_text.split_whitespace().map(String::from);

        Self {
            user_name: field("user_name"),
            channel_name: field("channel_name"),
            command: field("command"),
            text: words.next().unwrap_or_default(),
            args: words.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slack_form() -> HashMap<String, String> {
        [
            ("token", "xyz"),
            ("user_name", "Guilherme"),
            ("channel_name", "test"),
            ("command", "/codefreeze"),
            ("text", " enable Jan 20 "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn extracts_command_fields() {
        let command = SlashCommand::from_form(&slack_form());
        assert_eq!(command.command, "/codefreeze");
        assert_eq!(command.user_name, "Guilherme");
        assert_eq!(command.channel_name, "test");
    }

    #[test]
    fn splits_text_into_sub_command_and_args() {
        let command = SlashCommand::from_form(&slack_form());
        assert_eq!(command.text, "enable");
        assert_eq!(command.args, ["Jan", "20"]);
    }

    #[test]
    fn empty_text_gives_empty_sub_command() {
        let command = SlashCommand::from_form(&HashMap::new());
        assert_eq!(command.text, "");
        assert!(command.args.is_empty());
    }

    #[test]
    fn parses_pull_request_links() {
        let link = PullRequestLink::parse("https://github.com/org/api/pull/12").unwrap();
        assert_eq!(
            link,
            PullRequestLink {
                owner: "org".to_string(),
                repo: "api".to_string(),
                number: 12
            }
        );
        assert_eq!(
            link.comments_url("https://api.github.com/"),
            "https://api.github.com/repos/org/api/issues/12/comments"
        );
        assert_eq!(
            link.statuses_url("https://api.github.com", "abc"),
            "https://api.github.com/repos/org/api/statuses/abc"
        );
    }

    #[test]
    fn rejects_other_links() {
        for raw in [
            "https://github.com/org/api/issues/12",
            "https://example.com/org/api/pull/12",
            "https://github.com/org/api/pull/abc",
        ] {
            assert!(PullRequestLink::parse(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn ci_event_accepts_numeric_build_and_empty_link() {
        let event: CiEvent = serde_json::from_str(
            r#"{"commit_sha":"abc","owner":"org","project":"api","build_num":42,"pr_link":""}"#,
        )
        .unwrap();
        assert_eq!(event.build_num, "42");
        assert_eq!(event.pr_link, None);

        let event: CiEvent = serde_json::from_str(
            r#"{"commit_sha":"abc","owner":"org","project":"api","build_num":"7"}"#,
        )
        .unwrap();
        assert_eq!(event.build_num, "7");
        assert_eq!(event.pr_link, None);
    }
}
