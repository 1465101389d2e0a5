//! CI collaborator: build artifacts and the report links derived from them

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::{HooksError, Result};
use crate::reports::QualityTool;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const COVERAGE_ARTIFACT: &str = "coverage.html";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildArtifact {
    pub path: String,
    pub url: String,
}

#[async_trait]
pub trait CiPlatform: Send + Sync + 'static {
    async fn list_artifacts(
        &self,
        owner: &str,
        project: &str,
        build_num: &str,
    ) -> Result<Vec<BuildArtifact>>;
}

pub struct CircleCiClient {
    http: reqwest::Client,
    api_url: String,
}

impl CircleCiClient {
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| HooksError::ConfigError(format!("invalid CircleCI token: {}", e)))?;
            headers.insert("Circle-Token", value);
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CiPlatform for CircleCiClient {
    async fn list_artifacts(
        &self,
        owner: &str,
        project: &str,
        build_num: &str,
    ) -> Result<Vec<BuildArtifact>> {
        let url = format!(
            "{}/project/github/{}/{}/{}/artifacts",
            self.api_url, owner, project, build_num
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            let response_text = response.text().await.unwrap_or_default();
            return Err(HooksError::CircleCi { url, response_text });
        }
        Ok(response.json().await?)
    }
}

/// Links to the HTML reports published by one build.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLinks {
    pub coverage: String,
    pub flake8: String,
    pub eslint: String,
}

impl ReportLinks {
    pub fn quality(&self, tool: QualityTool) -> &str {
        match tool {
            QualityTool::Flake8 => &self.flake8,
            QualityTool::Eslint => &self.eslint,
        }
    }
}

/// The commit a CI build produced reports for.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleCommit {
    pub owner: String,
    pub project: String,
    pub commit_sha: String,
    pub build_num: String,
    pub quality_tool: QualityTool,
    pub repo_id: Option<u64>,
}

impl CircleCommit {
    fn fallback_url(&self, name: &str) -> String {
        let repo_id = self.repo_id.map(|id| id.to_string()).unwrap_or_default();
        format!(
            "https://{}-{}-gh.circle-artifacts.com/0/quality-reports/{}",
            self.build_num, repo_id, name
        )
    }

    fn link_for(&self, artifacts: &[BuildArtifact], name: &str) -> String {
        artifacts
            .iter()
            .find(|a| a.path.ends_with(name))
            .map(|a| a.url.clone())
            .unwrap_or_else(|| self.fallback_url(name))
    }

    /// Report links taken from `artifacts`, or built from the artifact-host
    /// pattern for reports the listing does not contain.
    pub fn report_links(&self, artifacts: &[BuildArtifact]) -> ReportLinks {
        ReportLinks {
            coverage: self.link_for(artifacts, COVERAGE_ARTIFACT),
            flake8: self.link_for(artifacts, QualityTool::Flake8.artifact_name()),
            eslint: self.link_for(artifacts, QualityTool::Eslint.artifact_name()),
        }
    }

    /// Lists the build's artifacts and derives links. Listing failures only
    /// cost us the real URLs, so they fall back to the host pattern.
    pub async fn fetch_report_links(&self, ci: &dyn CiPlatform) -> ReportLinks {
        let artifacts = match ci
            .list_artifacts(&self.owner, &self.project, &self.build_num)
            .await
        {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(
                    "Could not list artifacts for build {} of {}/{}: {}",
                    self.build_num, self.owner, self.project, e
                );
                Vec::new()
            }
        };
        self.report_links(&artifacts)
    }
}
