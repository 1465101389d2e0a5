//! Pull request title / commit message standard check

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::HeaderMap,
};
use serde_json::Value;
use tracing::info;

use super::parse_payload;
use super::responses::{GitHubFailure, ok_response};
use crate::SharedState;
use crate::github::{CheckState, StatusCheck, remove_comment, upsert_comment};
use crate::summary::{STANDARD_MARKER, create_standard_summary};
use crate::utils::is_ignored_event;
use crate::webhook::PullRequestEvent;

/// Handles GitHub `pull_request` events: sets the standard status check and
/// keeps the guidelines comment in sync with the verdict.
pub async fn handle_pr_standard(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, GitHubFailure> {
    if is_ignored_event(&headers) {
        return Ok(ok_response());
    }

    let event: PullRequestEvent = parse_payload(&body)?;
    let pull_request = &event.pull_request;
    let github = state.github.as_ref();
    let standard = &state.config.standard;
    let author = state.config.github.user.as_deref();

    let commits = github.get_commits(&pull_request.commits_url).await?;
    let verdict = state.rules.validate_pr(&pull_request.title, &commits);
    info!(
        "PR '{}' with {} commits is {}standard: {}",
        pull_request.title,
        commits.len(),
        if verdict.valid { "" } else { "not " },
        verdict.reason
    );

    let check_state = if verdict.valid {
        CheckState::Success
    } else {
        CheckState::Failure
    };
    let check = StatusCheck::new(check_state, &standard.check_name, verdict.reason);
    github.update_status(&pull_request.statuses_url, &check).await?;

    if verdict.valid {
        remove_comment(github, &pull_request.comments_url, author, &[STANDARD_MARKER]).await?;
    } else {
        let summary = create_standard_summary(&verdict.report, verdict.reason, &standard.docs_link);
        upsert_comment(
            github,
            &pull_request.comments_url,
            author,
            &[STANDARD_MARKER],
            &summary,
        )
        .await?;
    }

    Ok(ok_response())
}
