use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use crate::circleci::CircleCommit;
use crate::error::{HooksError, Result};
use crate::freeze::{FreezeState, FreezeStatus};
use crate::reports::{CoverageReport, QualityReport, QualityTool};

/// Reports extracted for one commit, kept so a later PR event can re-post them.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReports {
    pub commit_sha: String,
    pub owner: String,
    pub project: String,
    pub build_num: String,
    pub quality_tool: QualityTool,
    pub pr_link: Option<String>,
    pub cov_report: Option<CoverageReport>,
    pub quality_report: Option<QualityReport>,
    pub created_at: DateTime<Utc>,
}

impl StoredReports {
    pub fn circle_commit(&self, repo_id: u64) -> CircleCommit {
        CircleCommit {
            owner: self.owner.clone(),
            project: self.project.clone(),
            commit_sha: self.commit_sha.clone(),
            build_num: self.build_num.clone(),
            quality_tool: self.quality_tool,
            repo_id: Some(repo_id),
        }
    }
}

/// Key-value configuration store plus the per-commit report table.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    async fn get_config(&self, name: &str) -> Result<Option<FreezeState>>;
    /// Replaces the named record wholesale.
    async fn put_config(&self, name: &str, state: &FreezeState) -> Result<()>;
    async fn save_reports(&self, reports: &StoredReports) -> Result<()>;
    async fn get_reports(&self, commit_sha: &str) -> Result<Option<StoredReports>>;
}

#[derive(FromRow)]
struct ConfigRow {
    status: String,
    author: String,
}

#[derive(FromRow)]
struct ReportsRow {
    commit_sha: String,
    owner: String,
    project: String,
    build_num: String,
    quality_tool: String,
    pr_link: Option<String>,
    cov_report: Option<String>,
    quality_report: Option<String>,
    created_at: String,
}

impl TryFrom<ReportsRow> for StoredReports {
    type Error = HooksError;

    fn try_from(row: ReportsRow) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredReports {
            commit_sha: row.commit_sha,
            owner: row.owner,
            project: row.project,
            build_num: row.build_num,
            quality_tool: row.quality_tool.parse().unwrap_or_default(),
            pr_link: row.pr_link,
            cov_report: row.cov_report.as_deref().map(serde_json::from_str).transpose()?,
            quality_report: row
                .quality_report
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at,
        })
    }
}

/// Persistent storage using SQLite
#[derive(Clone)]
pub struct SqlConfigStore {
    pool: SqlitePool,
}

impl SqlConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigStore for SqlConfigStore {
    async fn get_config(&self, name: &str) -> Result<Option<FreezeState>> {
        let row: Option<ConfigRow> = sqlx::query_as(
            "SELECT status, author FROM code_freeze_config WHERE config_name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to read config: {}", e)))?;

        Ok(row.map(|row| {
            let status = FreezeStatus::parse(&row.status).unwrap_or_else(|| {
                warn!("Unknown freeze status '{}' stored for {}", row.status, name);
                FreezeStatus::default()
            });
            FreezeState {
                status,
                author: row.author,
            }
        }))
    }

    async fn put_config(&self, name: &str, state: &FreezeState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO code_freeze_config (config_name, status, author, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(config_name) DO UPDATE SET
                status = excluded.status,
                author = excluded.author,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(state.status.as_str())
        .bind(&state.author)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    async fn save_reports(&self, reports: &StoredReports) -> Result<()> {
        let cov_report = reports
            .cov_report
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let quality_report = reports
            .quality_report
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO quality_reports (
                commit_sha, owner, project, build_num, quality_tool,
                pr_link, cov_report, quality_report, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reports.commit_sha)
        .bind(&reports.owner)
        .bind(&reports.project)
        .bind(&reports.build_num)
        .bind(reports.quality_tool.as_str())
        .bind(&reports.pr_link)
        .bind(cov_report)
        .bind(quality_report)
        .bind(reports.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to save reports: {}", e)))?;

        Ok(())
    }

    async fn get_reports(&self, commit_sha: &str) -> Result<Option<StoredReports>> {
        let row: Option<ReportsRow> = sqlx::query_as(
            r#"
            SELECT commit_sha, owner, project, build_num, quality_tool,
                   pr_link, cov_report, quality_report, created_at
            FROM quality_reports
            WHERE commit_sha = ?
            "#,
        )
        .bind(commit_sha)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to read reports: {}", e)))?;

        row.map(StoredReports::try_from).transpose()
    }
}
