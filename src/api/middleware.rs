//! Request stages wrapped around the handlers

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::utils::verify_signature;

/// Header carrying the CI callback signature.
pub const CI_SIGNATURE_HEADER: &str = "Ft-Signature";
/// Header carrying GitHub's sha1 webhook signature.
pub const GITHUB_SIGNATURE_HEADER: &str = "X-Hub-Signature";

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// Shared secret and the header a route expects its signature in.
#[derive(Clone)]
pub struct SignatureGate {
    secret: Arc<str>,
    header: &'static str,
}

impl SignatureGate {
    pub fn new(secret: &str, header: &'static str) -> Self {
        Self {
            secret: Arc::from(secret),
            header,
        }
    }
}

/// Buffers the body, checks its HMAC against the gate's header and answers
/// `404` on any mismatch. The buffered body is handed on untouched.
pub async fn verify_signature_middleware(
    State(gate): State<SignatureGate>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read request body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let signature = parts
        .headers
        .get(gate.header)
        .and_then(|v| v.to_str().ok());
    let valid = match signature {
        Some(signature) => verify_signature(&gate.secret, &bytes, signature),
        None => {
            error!("No signature found in '{}' header", gate.header);
            false
        }
    };

    if !valid {
        error!("Signature verification failed for {}", parts.uri.path());
        return StatusCode::NOT_FOUND.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Opens an `http.request` span per request and echoes its id back in
/// `x-request-id`.
pub async fn request_tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7().to_string();
    let span = info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| info!(status = response.status().as_u16(), "request completed"));

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
