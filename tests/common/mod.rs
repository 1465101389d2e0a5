#![allow(dead_code)]

use async_trait::async_trait;
use delivery_hooks::api::router;
use delivery_hooks::blob::BlobStore;
use delivery_hooks::circleci::{BuildArtifact, CiPlatform};
use delivery_hooks::db::{ConfigStore, StoredReports};
use delivery_hooks::error::{HooksError, Result};
use delivery_hooks::freeze::FreezeState;
use delivery_hooks::github::{
    CommentUser, CommitDetail, IssueComment, OpenPullRequest, PullRequestCommit, SourceControl,
    StatusCheck,
};
use delivery_hooks::utils::sign_payload;
use delivery_hooks::{AppState, HooksConfig, SharedState};
use reqwest::Response;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "s3cret";
pub const BOT: &str = "finetune-bot";
pub const API: &str = "https://api.github.test";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Status { url: String, check: StatusCheck },
    CreateComment { url: String, body: String },
    EditComment { url: String, body: String },
    DeleteComment { url: String },
}

/// In-memory source control that records every write.
#[derive(Default)]
pub struct FakeSourceControl {
    pub commits: Vec<PullRequestCommit>,
    pub comments: Mutex<Vec<IssueComment>>,
    pub open_pulls: HashMap<String, Vec<OpenPullRequest>>,
    pub repo_id: u64,
    pub fail_statuses: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeSourceControl {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, StatusCheck)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Status { url, check } => Some((url, check)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn get_commits(&self, _commits_url: &str) -> Result<Vec<PullRequestCommit>> {
        Ok(self.commits.clone())
    }

    async fn update_status(&self, statuses_url: &str, check: &StatusCheck) -> Result<()> {
        if self.fail_statuses {
            return Err(HooksError::GitHub {
                url: statuses_url.to_string(),
                response_text: "Bad credentials".to_string(),
            });
        }
        self.record(Call::Status {
            url: statuses_url.to_string(),
            check: check.clone(),
        });
        Ok(())
    }

    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<OpenPullRequest>> {
        Ok(self.open_pulls.get(repo).cloned().unwrap_or_default())
    }

    async fn list_comments(&self, _comments_url: &str) -> Result<Vec<IssueComment>> {
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn create_comment(&self, comments_url: &str, body: &str) -> Result<()> {
        self.record(Call::CreateComment {
            url: comments_url.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn edit_comment(&self, comment_url: &str, body: &str) -> Result<()> {
        self.record(Call::EditComment {
            url: comment_url.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn delete_comment(&self, comment_url: &str) -> Result<()> {
        self.record(Call::DeleteComment {
            url: comment_url.to_string(),
        });
        Ok(())
    }

    async fn get_repo_id(&self, _owner: &str, _repo: &str) -> Result<u64> {
        Ok(self.repo_id)
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub configs: Mutex<HashMap<String, FreezeState>>,
    pub reports: Mutex<HashMap<String, StoredReports>>,
}

#[async_trait]
impl ConfigStore for FakeStore {
    async fn get_config(&self, name: &str) -> Result<Option<FreezeState>> {
        Ok(self.configs.lock().unwrap().get(name).cloned())
    }

    async fn put_config(&self, name: &str, state: &FreezeState) -> Result<()> {
        self.configs
            .lock()
            .unwrap()
            .insert(name.to_string(), state.clone());
        Ok(())
    }

    async fn save_reports(&self, reports: &StoredReports) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .insert(reports.commit_sha.clone(), reports.clone());
        Ok(())
    }

    async fn get_reports(&self, commit_sha: &str) -> Result<Option<StoredReports>> {
        Ok(self.reports.lock().unwrap().get(commit_sha).cloned())
    }
}

/// Blobs keyed by `prefix/key`.
#[derive(Default)]
pub struct FakeBlobs {
    pub objects: HashMap<String, String>,
}

impl FakeBlobs {
    pub fn with(mut self, prefix: &str, key: &str, text: &str) -> Self {
        self.objects
            .insert(format!("{}/{}", prefix, key), text.to_string());
        self
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn get_text(&self, prefix: &str, key: &str) -> Result<Option<String>> {
        Ok(self.objects.get(&format!("{}/{}", prefix, key)).cloned())
    }
}

#[derive(Default)]
pub struct FakeCi {
    pub artifacts: Vec<BuildArtifact>,
}

#[async_trait]
impl CiPlatform for FakeCi {
    async fn list_artifacts(
        &self,
        _owner: &str,
        _project: &str,
        _build_num: &str,
    ) -> Result<Vec<BuildArtifact>> {
        Ok(self.artifacts.clone())
    }
}

pub fn test_config() -> HooksConfig {
    let mut config = HooksConfig::default();
    config.github.api_url = API.to_string();
    config.github.user = Some(BOT.to_string());
    config.quality.webhook_secret = Some(SECRET.to_string());
    config.code_freeze.repositories = vec!["org/api".to_string(), "org/web".to_string()];
    config.code_freeze.authorized_users = vec!["ana".to_string()];
    config
}

pub struct Harness {
    pub github: Arc<FakeSourceControl>,
    pub store: Arc<FakeStore>,
    pub state: SharedState,
    pub base: String,
    client: reqwest::Client,
}

/// Serves the router on an ephemeral port backed by the given fakes.
pub async fn harness(github: FakeSourceControl, blobs: FakeBlobs, ci: FakeCi) -> Harness {
    let github = Arc::new(github);
    let store = Arc::new(FakeStore::default());
    let state = Arc::new(
        AppState::new(
            test_config(),
            github.clone(),
            store.clone(),
            Arc::new(blobs),
            Arc::new(ci),
        )
        .unwrap(),
    );

    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    Harness {
        github,
        store,
        state,
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
    }
}

impl Harness {
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
    }

    /// Source-control webhook delivery of a `pull_request` event.
    pub async fn deliver(&self, path: &str, body: String) -> Response {
        self.post(path, body)
            .header("X-GitHub-Event", "pull_request")
            .send()
            .await
            .unwrap()
    }

    pub async fn signed(&self, path: &str, header: &str, body: String) -> Response {
        let signature = sign_payload(SECRET, body.as_bytes());
        self.post(path, body)
            .header(header, signature)
            .send()
            .await
            .unwrap()
    }

    pub async fn slack(&self, user: &str, text: &str) -> Response {
        let body = format!(
            "token=xyz&user_name={}&channel_name=releases&command=%2Fcodefreeze&text={}",
            user,
            text.replace(' ', "+")
        );
        self.client
            .post(format!("{}/codefreeze/slack", self.base))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    pub fn post(&self, path: &str, body: String) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base, path))
            .header("content-type", "application/json")
            .body(body)
    }
}

pub fn commit(sha: &str, message: &str) -> PullRequestCommit {
    PullRequestCommit {
        sha: sha.to_string(),
        commit: CommitDetail {
            message: message.to_string(),
        },
    }
}

pub fn comment(url: &str, login: &str, body: &str) -> IssueComment {
    IssueComment {
        url: url.to_string(),
        body: body.to_string(),
        user: CommentUser {
            login: login.to_string(),
        },
    }
}

pub fn pull_request_event(title: &str, head_sha: &str) -> String {
    serde_json::json!({
        "action": "opened",
        "pull_request": {
            "title": title,
            "statuses_url": format!("{}/repos/org/api/statuses/{}", API, head_sha),
            "comments_url": format!("{}/repos/org/api/issues/7/comments", API),
            "commits_url": format!("{}/repos/org/api/pulls/7/commits", API),
            "head": { "sha": head_sha }
        },
        "repository": { "id": 4242 }
    })
    .to_string()
}
