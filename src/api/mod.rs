//! API module for all HTTP handlers
//!
//! Every inbound surface (source control, CI callback, chat) is routed here;
//! signature checks are attached per route.

pub mod codefreeze;
pub mod middleware;
pub mod pr_standard;
pub mod quality;
pub mod responses;

use axum::{
    Json, Router,
    extract::{Query, State as AxumState},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

use crate::SharedState;
use crate::error::HooksError;
use crate::freeze::current_state;

pub use codefreeze::{handle_freeze_command, handle_freeze_pull_request};
pub use middleware::{
    CI_SIGNATURE_HEADER, GITHUB_SIGNATURE_HEADER, SignatureGate, request_tracing_middleware,
    verify_signature_middleware,
};
pub use pr_standard::handle_pr_standard;
pub use quality::{handle_ci_reports, handle_pull_request_reports};

/// Decodes a JSON webhook body.
pub(crate) fn parse_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, HooksError> {
    serde_json::from_slice(body)
        .map_err(|e| HooksError::InvalidPayload(format!("Failed to parse payload: {}", e)))
}

/// Health check. Supports `?format=json`, which also reports the freeze flag.
pub async fn root(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("format").map(|s| s.as_str()) != Some("json") {
        return "delivery_hooks - healthy".into_response();
    }

    let code_freeze = match current_state(state.store.as_ref()).await {
        Ok(freeze) => json!({ "status": freeze.status, "author": freeze.author }),
        Err(e) => {
            warn!("Could not read code freeze state: {}", e);
            json!(null)
        }
    };

    Json(json!({
        "name": "delivery_hooks",
        "version": env!("CARGO_PKG_VERSION"),
        "code_freeze": code_freeze,
        "repositories": state.config.code_freeze.repositories.len(),
        "status": "healthy"
    }))
    .into_response()
}

/// Builds the full router. The webhook secret was validated when the state
/// was created, so an absent one here only means every signed route 404s.
pub fn router(state: SharedState) -> Router {
    let secret = state.config.quality.webhook_secret.clone().unwrap_or_default();
    let ci_gate = SignatureGate::new(&secret, CI_SIGNATURE_HEADER);
    let github_gate = SignatureGate::new(&secret, GITHUB_SIGNATURE_HEADER);

    Router::new()
        .route("/", routing::get(root))
        .route("/pr-standard", routing::post(handle_pr_standard))
        .route(
            "/quality/ci",
            routing::post(handle_ci_reports)
                .layer(from_fn_with_state(ci_gate, verify_signature_middleware)),
        )
        .route(
            "/quality/github",
            routing::post(handle_pull_request_reports)
                .layer(from_fn_with_state(github_gate, verify_signature_middleware)),
        )
        .route("/codefreeze/slack", routing::post(handle_freeze_command))
        .route("/codefreeze/github", routing::post(handle_freeze_pull_request))
        .layer(from_fn(request_tracing_middleware))
        .with_state(state)
}
