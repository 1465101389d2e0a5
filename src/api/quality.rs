//! Coverage / quality reports: CI callback and PR re-post handlers

use axum::{Json, body::Bytes, extract::State as AxumState, http::HeaderMap};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::parse_payload;
use super::responses::{GitHubFailure, ok_response};
use crate::blob::{COVERAGE_PREFIX, QUALITY_PREFIX};
use crate::circleci::ReportLinks;
use crate::db::StoredReports;
use crate::error::Result;
use crate::github::{CheckState, StatusCheck, remove_comment, upsert_comment};
use crate::reports::{CoverageReport, QualityReport, QualityTool, read_coverage, read_quality};
use crate::summary::{
    QUALITY_MARKERS, create_coverage_footer, create_quality_comment, create_quality_footer,
};
use crate::utils::{is_ignored_event, percentage_digits};
use crate::webhook::{CiEvent, PullRequestEvent, PullRequestLink};
use crate::{AppState, SharedState};

const NO_REPORT_DESCRIPTION: &str = "No report provided for this commit";

/// Builds the `<prefix> <key>` status for one report value.
pub fn quality_status(
    value: Option<&str>,
    key: &str,
    threshold: u32,
    prefix: &str,
    link: &str,
) -> StatusCheck {
    let context = format!("{} {}", prefix, key);
    let Some(value) = value else {
        return StatusCheck::new(CheckState::Success, context, NO_REPORT_DESCRIPTION);
    };

    let percentage = percentage_digits(value);
    let check = if percentage >= u64::from(threshold) {
        StatusCheck::new(
            CheckState::Success,
            context,
            format!("{} diff is good!", key),
        )
    } else {
        StatusCheck::new(
            CheckState::Failure,
            context,
            format!(
                "{} diff is below expected ({}% out of {}%)",
                key, percentage, threshold
            ),
        )
    };
    check.with_target_url(link)
}

/// Where on the pull request the reports go.
struct PullRequestTarget<'a> {
    comments_url: &'a str,
    statuses_url: &'a str,
}

/// Syncs the summary comment and sets both status checks.
async fn update_github_pr(
    state: &AppState,
    target: PullRequestTarget<'_>,
    coverage: Option<&CoverageReport>,
    quality: Option<&QualityReport>,
    tool: QualityTool,
    links: &ReportLinks,
) -> Result<()> {
    let github = state.github.as_ref();
    let author = state.config.github.user.as_deref();
    let settings = &state.config.quality;
    let quality_link = links.quality(tool);

    let comment = create_quality_comment(
        coverage,
        quality,
        &create_coverage_footer(&links.coverage),
        &create_quality_footer(quality_link),
    );
    match comment {
        Some(body) => {
            upsert_comment(github, target.comments_url, author, &QUALITY_MARKERS, &body).await?
        }
        None => {
            remove_comment(github, target.comments_url, author, &QUALITY_MARKERS).await?;
        }
    }

    let coverage_check = quality_status(
        coverage.map(|r| r.coverage.as_str()),
        "Coverage",
        settings.coverage_threshold,
        &settings.check_prefix,
        &links.coverage,
    );
    let quality_check = quality_status(
        quality.map(|r| r.quality.as_str()),
        "Quality",
        settings.quality_threshold,
        &settings.check_prefix,
        quality_link,
    );
    github.update_status(target.statuses_url, &coverage_check).await?;
    github.update_status(target.statuses_url, &quality_check).await?;

    Ok(())
}

/// CI callback: reads the uploaded reports for the commit, stores them and,
/// when the build belongs to a pull request, updates that PR.
pub async fn handle_ci_reports(
    AxumState(state): AxumState<SharedState>,
    body: Bytes,
) -> std::result::Result<Json<Value>, GitHubFailure> {
    let event: CiEvent = parse_payload(&body)?;
    info!(
        "Reports received for {}/{} commit {} (build {})",
        event.owner, event.project, event.commit_sha, event.build_num
    );

    let coverage_text = state.blobs.get_text(COVERAGE_PREFIX, &event.commit_sha).await?;
    let quality_text = state.blobs.get_text(QUALITY_PREFIX, &event.commit_sha).await?;
    let coverage = read_coverage(coverage_text.as_deref())?;
    let quality = read_quality(quality_text.as_deref())?;

    let stored = StoredReports {
        commit_sha: event.commit_sha.clone(),
        owner: event.owner.clone(),
        project: event.project.clone(),
        build_num: event.build_num.clone(),
        quality_tool: quality.tool,
        pr_link: event.pr_link.clone(),
        cov_report: coverage,
        quality_report: quality.report,
        created_at: Utc::now(),
    };
    state.store.save_reports(&stored).await?;

    let Some(pr_link) = event.pr_link.as_deref() else {
        info!("Commit {} is not part of a pull request", event.commit_sha);
        return Ok(ok_response());
    };

    let link = PullRequestLink::parse(pr_link)?;
    let api_url = &state.config.github.api_url;
    let repo_id = state.github.get_repo_id(&link.owner, &link.repo).await?;

    let mut commit = event.circle_commit(stored.quality_tool);
    commit.repo_id = Some(repo_id);
    let links = commit.fetch_report_links(state.ci.as_ref()).await;

    let comments_url = link.comments_url(api_url);
    let statuses_url = link.statuses_url(api_url, &event.commit_sha);
    update_github_pr(
        &state,
        PullRequestTarget {
            comments_url: &comments_url,
            statuses_url: &statuses_url,
        },
        stored.cov_report.as_ref(),
        stored.quality_report.as_ref(),
        stored.quality_tool,
        &links,
    )
    .await?;

    Ok(ok_response())
}

/// Pull request event: re-posts the reports stored for the head commit.
pub async fn handle_pull_request_reports(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, GitHubFailure> {
    if is_ignored_event(&headers) {
        return Ok(ok_response());
    }

    let event: PullRequestEvent = parse_payload(&body)?;
    let pull_request = &event.pull_request;
    let Some(stored) = state.store.get_reports(&pull_request.head.sha).await? else {
        info!("No stored reports for commit {}", pull_request.head.sha);
        return Ok(ok_response());
    };

    let links = stored
        .circle_commit(event.repository.id)
        .fetch_report_links(state.ci.as_ref())
        .await;
    update_github_pr(
        &state,
        PullRequestTarget {
            comments_url: &pull_request.comments_url,
            statuses_url: &pull_request.statuses_url,
        },
        stored.cov_report.as_ref(),
        stored.quality_report.as_ref(),
        stored.quality_tool,
        &links,
    )
    .await?;

    Ok(ok_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://ci/coverage.html";

    #[test]
    fn value_at_threshold_is_good() {
        let check = quality_status(Some("80%"), "Coverage", 80, "FineTune", LINK);
        assert_eq!(check.state, CheckState::Success);
        assert_eq!(check.context, "FineTune Coverage");
        assert_eq!(check.description, "Coverage diff is good!");
        assert_eq!(check.target_url.as_deref(), Some(LINK));
    }

    #[test]
    fn value_below_threshold_fails() {
        let check = quality_status(Some("99%"), "Quality", 100, "FineTune", LINK);
        assert_eq!(check.state, CheckState::Failure);
        assert_eq!(
            check.description,
            "Quality diff is below expected (99% out of 100%)"
        );
    }

    #[test]
    fn missing_report_passes_without_link() {
        let check = quality_status(None, "Coverage", 80, "Team", LINK);
        assert_eq!(check.state, CheckState::Success);
        assert_eq!(check.context, "Team Coverage");
        assert_eq!(check.description, NO_REPORT_DESCRIPTION);
        assert!(check.target_url.is_none());
    }

    #[test]
    fn unreadable_value_counts_as_zero() {
        let check = quality_status(Some("n/a"), "Coverage", 80, "FineTune", LINK);
        assert_eq!(check.state, CheckState::Failure);
        assert_eq!(
            check.description,
            "Coverage diff is below expected (0% out of 80%)"
        );
    }
}
