use axum::http::HeaderMap;
use tracing::{self, error, info};

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Helper function for verifying a webhook signature header of the form
/// `sha1=<hex>` (or `sha256=<hex>`) against the raw request body.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let Some((algorithm, signature)) = signature_header.split_once('=') else {
        error!("Signature header is not '<algorithm>=<hex>'");
        return false;
    };

    let signature_bytes = match hex_decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            error!("Signature is not valid hex");
            return false;
        }
    };

    // verify_slice compares in constant time
    let verified = match algorithm {
        "sha1" => HmacSha1::new_from_slice(secret.as_bytes()).map(|mut mac| {
            mac.update(payload);
            mac.verify_slice(&signature_bytes).is_ok()
        }),
        "sha256" => HmacSha256::new_from_slice(secret.as_bytes()).map(|mut mac| {
            mac.update(payload);
            mac.verify_slice(&signature_bytes).is_ok()
        }),
        other => {
            error!("Signature not signed with sha1 or sha256 (got '{}')", other);
            return false;
        }
    };

    verified.unwrap_or(false)
}

/// Computes the `sha1=<hex>` header value for `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// True when the request carries an `X-GitHub-Event` other than `pull_request`.
pub fn is_ignored_event(headers: &HeaderMap) -> bool {
    match headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok()) {
        Some("pull_request") | None => false,
        Some(other) => {
            info!("Not a pull_request event; Received {:?} event", other);
            true
        }
    }
}

/// Keeps only the digits of a report value: `"99%"` -> 99. Values with no
/// digits read as 0.
pub fn percentage_digits(value: &str) -> u64 {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
