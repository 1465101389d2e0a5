//! Source-control collaborator: the GitHub REST calls the hooks rely on

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{HooksError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
}

/// Entry of `GET /repos/{owner}/{repo}/pulls/{number}/commits`
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub url: String,
    pub body: String,
    pub user: CommentUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPullRequest {
    pub number: u64,
    pub statuses_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Success,
    Failure,
}

/// Body of `POST /repos/{owner}/{repo}/statuses/{sha}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCheck {
    pub state: CheckState,
    pub context: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl StatusCheck {
    pub fn new(state: CheckState, context: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            state,
            context: context.into(),
            description: description.into(),
            target_url: None,
        }
    }

    /// Attaches a details link; empty links are dropped.
    pub fn with_target_url(mut self, url: &str) -> Self {
        self.target_url = (!url.is_empty()).then(|| url.to_string());
        self
    }
}

#[async_trait]
pub trait SourceControl: Send + Sync + 'static {
    async fn get_commits(&self, commits_url: &str) -> Result<Vec<PullRequestCommit>>;
    async fn update_status(&self, statuses_url: &str, check: &StatusCheck) -> Result<()>;
    /// `repo` is `owner/name`
    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<OpenPullRequest>>;
    async fn list_comments(&self, comments_url: &str) -> Result<Vec<IssueComment>>;
    async fn create_comment(&self, comments_url: &str, body: &str) -> Result<()>;
    async fn edit_comment(&self, comment_url: &str, body: &str) -> Result<()>;
    async fn delete_comment(&self, comment_url: &str) -> Result<()>;
    async fn get_repo_id(&self, owner: &str, repo: &str) -> Result<u64>;
}

/// GitHub v3 REST client authenticated with a personal/bot token.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|e| HooksError::ConfigError(format!("invalid GitHub token: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("delivery_hooks"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the request and turns any non-2xx answer into a `GitHub` error
    /// carrying the upstream body.
    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();
        debug!("GitHub answered {} for {}", status, url);
        Err(HooksError::GitHub {
            url: url.to_string(),
            response_text,
        })
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn get_commits(&self, commits_url: &str) -> Result<Vec<PullRequestCommit>> {
        let response = self.send(commits_url, self.http.get(commits_url)).await?;
        Ok(response.json().await?)
    }

    async fn update_status(&self, statuses_url: &str, check: &StatusCheck) -> Result<()> {
        self.send(statuses_url, self.http.post(statuses_url).json(check))
            .await?;
        Ok(())
    }

    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<OpenPullRequest>> {
        let url = format!("{}/repos/{}/pulls?state=open&per_page=100", self.api_url, repo);
        let response = self.send(&url, self.http.get(&url)).await?;
        Ok(response.json().await?)
    }

    async fn list_comments(&self, comments_url: &str) -> Result<Vec<IssueComment>> {
        let response = self.send(comments_url, self.http.get(comments_url)).await?;
        Ok(response.json().await?)
    }

    async fn create_comment(&self, comments_url: &str, body: &str) -> Result<()> {
        let payload = json!({ "body": body });
        self.send(comments_url, self.http.post(comments_url).json(&payload))
            .await?;
        Ok(())
    }

    async fn edit_comment(&self, comment_url: &str, body: &str) -> Result<()> {
        let payload = json!({ "body": body });
        self.send(comment_url, self.http.patch(comment_url).json(&payload))
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, comment_url: &str) -> Result<()> {
        self.send(comment_url, self.http.delete(comment_url)).await?;
        Ok(())
    }

    async fn get_repo_id(&self, owner: &str, repo: &str) -> Result<u64> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, repo);
        let response = self.send(&url, self.http.get(&url)).await?;
        let body: serde_json::Value = response.json().await?;
        body.get("id")
            .and_then(|id| id.as_u64())
            .ok_or_else(|| HooksError::GitHub {
                url,
                response_text: "repository payload has no numeric id".to_string(),
            })
    }
}

/// Finds the comment to edit in place: the first one containing any of the
/// markers, written by `author` when an author is configured.
pub async fn find_comment_url(
    github: &dyn SourceControl,
    comments_url: &str,
    author: Option<&str>,
    markers: &[&str],
) -> Result<Option<String>> {
    let comments = github.list_comments(comments_url).await?;
    Ok(comments
        .into_iter()
        .find(|c| {
            markers.iter().any(|m| c.body.contains(m))
                && author.is_none_or(|login| c.user.login == login)
        })
        .map(|c| c.url))
}

/// Edits the marked comment if it exists, otherwise creates it.
pub async fn upsert_comment(
    github: &dyn SourceControl,
    comments_url: &str,
    author: Option<&str>,
    markers: &[&str],
    body: &str,
) -> Result<()> {
    match find_comment_url(github, comments_url, author, markers).await? {
        Some(comment_url) => {
            info!("Editing summary comment {}", comment_url);
            github.edit_comment(&comment_url, body).await
        }
        None => {
            info!("Creating summary comment on {}", comments_url);
            github.create_comment(comments_url, body).await
        }
    }
}

/// Deletes the marked comment if there is one.
pub async fn remove_comment(
    github: &dyn SourceControl,
    comments_url: &str,
    author: Option<&str>,
    markers: &[&str],
) -> Result<bool> {
    match find_comment_url(github, comments_url, author, markers).await? {
        Some(comment_url) => {
            info!("Deleting summary comment {}", comment_url);
            github.delete_comment(&comment_url).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_check_serializes_like_the_api_expects() {
        let check = StatusCheck::new(CheckState::Failure, "PR standard", "bad title")
            .with_target_url("https://ci/report.html");
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(
            value,
            json!({
                "state": "failure",
                "context": "PR standard",
                "description": "bad title",
                "target_url": "https://ci/report.html"
            })
        );
    }

    #[test]
    fn empty_target_url_is_omitted() {
        let check = StatusCheck::new(CheckState::Success, "Code Freeze", "").with_target_url("");
        let value = serde_json::to_value(&check).unwrap();
        assert!(value.get("target_url").is_none());
        assert_eq!(value["description"], "");
    }

    #[test]
    fn client_rejects_unprintable_tokens() {
        assert!(GitHubClient::new("https://api.github.com", "bad\ntoken").is_err());
    }
}
