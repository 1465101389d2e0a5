//! Response shapes shared by the handlers, including how failures are
//! reported back to each origin (source control vs chat).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::error::Error as _;
use tracing::error;

use crate::error::HooksError;

/// `200` with the JSON string `"ok"`.
pub fn ok_response() -> Json<Value> {
    Json(json!("ok"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible only to the user who ran the command
    Ephemeral,
    InChannel,
}

/// Slash-command reply body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub response_type: ResponseType,
    pub text: String,
}

impl SlackMessage {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: text.into(),
        }
    }

    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::InChannel,
            text: text.into(),
        }
    }
}

impl IntoResponse for SlackMessage {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

fn cause_chain(error: &HooksError) -> String {
    let mut lines = vec![format!("{:?}", error)];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

/// Ordered key/value description of a failure.
pub fn error_details(error: &HooksError) -> Vec<(&'static str, String)> {
    let mut details = vec![
        ("exception", error.to_string()),
        ("stacktrace", cause_chain(error)),
    ];
    match error {
        HooksError::GitHub { url, response_text } => {
            details.insert(0, ("type", "github".to_string()));
            details.push(("url_requested", url.clone()));
            details.push(("gh_response", response_text.clone()));
        }
        _ => details.insert(0, ("type", "unknown".to_string())),
    }
    details
}

/// Failure of a handler invoked by source control or CI: a JSON body with
/// the error details, `400` for unreadable payloads and `500` otherwise.
#[derive(Debug)]
pub struct GitHubFailure(pub HooksError);

impl From<HooksError> for GitHubFailure {
    fn from(error: HooksError) -> Self {
        Self(error)
    }
}

impl IntoResponse for GitHubFailure {
    fn into_response(self) -> Response {
        let details = error_details(&self.0);
        error!("GitHub handler failed: {:?}", details);

        let status = match &self.0 {
            HooksError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body: Map<String, Value> = details
            .into_iter()
            .map(|(key, value)| (key.to_string(), Value::String(value)))
            .collect();

        (status, Json(Value::Object(body))).into_response()
    }
}

/// Failure of a chat command: still a `200`, rendered as an ephemeral
/// message listing the error details.
#[derive(Debug)]
pub struct SlackFailure(pub HooksError);

impl From<HooksError> for SlackFailure {
    fn from(error: HooksError) -> Self {
        Self(error)
    }
}

impl IntoResponse for SlackFailure {
    fn into_response(self) -> Response {
        let details = error_details(&self.0);
        error!("Slack handler failed: {:?}", details);

        let text: String = details
            .iter()
            .map(|(key, value)| format!("\n*{}:* {}", key, value))
            .collect();

        SlackMessage::ephemeral(text).into_response()
    }
}
