use axum::{
    Form, Json,
    body::Bytes,
    extract::State as AxumState,
    http::HeaderMap,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

use super::parse_payload;
use super::responses::{GitHubFailure, SlackFailure, SlackMessage, ok_response};
use crate::SharedState;
use crate::freeze::{FreezeCheck, FreezeCommand, FreezeState, FreezeStatus, current_state, toggle};
use crate::utils::is_ignored_event;
use crate::webhook::{PullRequestEvent, SlashCommand};

fn usage(command: &str) -> String {
    format!(
        "Usage: `{0} enable`, `{0} disable` or `{0} status`",
        if command.is_empty() { "/codefreeze" } else { command }
    )
}

/// Slash-command entry point: `enable` / `disable` toggle the freeze for
/// every configured repository, `status` reports it.
pub async fn handle_freeze_command(
    AxumState(state): AxumState<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<SlackMessage, SlackFailure> {
    let command = SlashCommand::from_form(&form);
    let settings = &state.config.code_freeze;

    if !settings.is_authorized(&command.user_name) {
        warn!(
            "User '{}' tried to run {} {} in #{}",
            command.user_name, command.command, command.text, command.channel_name
        );
        return Ok(SlackMessage::ephemeral(format!(
            "Sorry {}, you are not allowed to change the code freeze.",
            command.user_name
        )));
    }

    let status = match FreezeCommand::parse(&command.text) {
        Some(FreezeCommand::Enable) => FreezeStatus::Enabled,
        Some(FreezeCommand::Disable) => FreezeStatus::Disabled,
        Some(FreezeCommand::Status) => {
            let current = current_state(state.store.as_ref()).await?;
            let text = if current.author.is_empty() {
                format!("Code freeze is {}.", current.status)
            } else {
                format!("Code freeze is {} (set by {}).", current.status, current.author)
            };
            return Ok(SlackMessage::ephemeral(text));
        }
        None => return Ok(SlackMessage::ephemeral(usage(&command.command))),
    };

    let new_state = FreezeState {
        status,
        author: command.user_name.clone(),
    };
    let check = FreezeCheck {
        context: &settings.check_name,
        message: &settings.message,
    };
    let updated = toggle(
        state.store.as_ref(),
        state.github.as_ref(),
        &settings.repositories,
        &new_state,
        check,
    )
    .await?;
    info!("Code freeze {} on {} pull requests", status, updated);

    Ok(SlackMessage::in_channel(format!(
        "Code freeze {} by {}.",
        status, command.user_name
    )))
}

/// Pull request event: applies the current freeze check to the PR's head.
pub async fn handle_freeze_pull_request(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, GitHubFailure> {
    if is_ignored_event(&headers) {
        return Ok(ok_response());
    }

    let event: PullRequestEvent = parse_payload(&body)?;
    let settings = &state.config.code_freeze;
    let current = current_state(state.store.as_ref()).await?;

    let check = current.status_check(&settings.check_name, &settings.message);
    state
        .github
        .update_status(&event.pull_request.statuses_url, &check)
        .await?;

    Ok(ok_response())
}
