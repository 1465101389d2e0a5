//! Fleet-wide merge freeze

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::db::ConfigStore;
use crate::error::Result;
use crate::github::{CheckState, SourceControl, StatusCheck};

/// Name of the record holding the freeze flag.
pub const FREEZE_CONFIG: &str = "FreezeStatus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreezeStatus {
    Enabled,
    #[default]
    Disabled,
}

impl FreezeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreezeStatus::Enabled => "enabled",
            FreezeStatus::Disabled => "disabled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "enabled" => Some(FreezeStatus::Enabled),
            "disabled" => Some(FreezeStatus::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for FreezeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreezeState {
    pub status: FreezeStatus,
    pub author: String,
}

impl FreezeState {
    pub fn is_enabled(&self) -> bool {
        self.status == FreezeStatus::Enabled
    }

    /// Status check every open PR should carry while in this state.
    pub fn status_check(&self, context: &str, message: &str) -> StatusCheck {
        match self.status {
            FreezeStatus::Enabled => StatusCheck::new(CheckState::Failure, context, message),
            FreezeStatus::Disabled => StatusCheck::new(CheckState::Success, context, ""),
        }
    }
}

/// Sub-commands of the freeze slash-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeCommand {
    Enable,
    Disable,
    Status,
}

impl FreezeCommand {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "enable" => Some(FreezeCommand::Enable),
            "disable" => Some(FreezeCommand::Disable),
            "status" => Some(FreezeCommand::Status),
            _ => None,
        }
    }
}

/// Reads the freeze record; an absent record means disabled.
pub async fn current_state(store: &dyn ConfigStore) -> Result<FreezeState> {
    Ok(store.get_config(FREEZE_CONFIG).await?.unwrap_or_default())
}

/// Status-check settings shared by every propagation.
#[derive(Debug, Clone, Copy)]
pub struct FreezeCheck<'a> {
    pub context: &'a str,
    pub message: &'a str,
}

/// Applies the state's check to every open PR of every repository.
/// Stops at the first upstream failure; PRs already updated keep their new
/// status.
pub async fn propagate(
    github: &dyn SourceControl,
    repositories: &[String],
    state: &FreezeState,
    check: FreezeCheck<'_>,
) -> Result<usize> {
    let status = state.status_check(check.context, check.message);
    let mut updated = 0;

    for repo in repositories {
        let pulls = github.list_open_pull_requests(repo).await?;
        info!(
            "Setting '{}' to {:?} on {} open PRs of {}",
            check.context,
            status.state,
            pulls.len(),
            repo
        );
        for pull in pulls {
            github.update_status(&pull.statuses_url, &status).await?;
            updated += 1;
        }
    }

    Ok(updated)
}

/// Persists the new state (last writer wins) and pushes it to open PRs.
pub async fn toggle(
    store: &dyn ConfigStore,
    github: &dyn SourceControl,
    repositories: &[String],
    state: &FreezeState,
    check: FreezeCheck<'_>,
) -> Result<usize> {
    store.put_config(FREEZE_CONFIG, state).await?;
    info!("Code freeze {} by '{}'", state.status, state.author);

    if repositories.is_empty() {
        warn!("Code freeze toggled but no repositories are configured");
    }
    propagate(github, repositories, state, check).await
}
