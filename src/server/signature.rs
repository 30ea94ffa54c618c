//! Slack request signature verification.
//!
//! Slack signs each request with HMAC-SHA256 over `v0:<timestamp>:<body>`
//! using the app's signing secret, and sends the result in
//! `X-Slack-Signature` as `v0=<hex>`. The timestamp comes in
//! `X-Slack-Request-Timestamp`; stale timestamps are rejected to stop replays.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use super::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_SIGNATURE: &str = "x-slack-signature";
pub const HEADER_TIMESTAMP: &str = "x-slack-request-timestamp";

/// How far a request timestamp may be from now.
pub const MAX_CLOCK_SKEW_SECONDS: i64 = 5 * 60;

/// Slack payloads are small; anything larger is not from Slack.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("request timestamp is missing or stale")]
    StaleTimestamp,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("could not read request body")]
    UnreadableBody,
}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let status = match &self {
            SignatureError::MissingHeader(_) | SignatureError::UnreadableBody => {
                StatusCode::BAD_REQUEST
            }
            SignatureError::StaleTimestamp | SignatureError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// Parses `v0=<hex>` into raw bytes. `None` for anything else.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix("v0=")?).ok()
}

fn mac_for(timestamp: &str, body: &[u8], secret: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

/// Computes the signature Slack would send for this request.
pub fn compute_signature(timestamp: &str, body: &[u8], secret: &[u8]) -> Vec<u8> {
    mac_for(timestamp, body, secret)
        .finalize()
        .into_bytes()
        .to_vec()
}

pub fn format_signature_header(signature: &[u8]) -> String {
    format!("v0={}", hex::encode(signature))
}

/// Constant-time check of a signature header against the request.
pub fn verify_signature(timestamp: &str, body: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected) = parse_signature_header(signature_header) else {
        return false;
    };
    mac_for(timestamp, body, secret)
        .verify_slice(&expected)
        .is_ok()
}

/// True if `timestamp` (Unix seconds) is within the allowed skew of `now`.
pub fn is_fresh(timestamp: &str, now: i64) -> bool {
    timestamp
        .parse::<i64>()
        .is_ok_and(|ts| (now - ts).abs() <= MAX_CLOCK_SKEW_SECONDS)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Middleware rejecting unsigned requests when a signing secret is configured.
///
/// The body is buffered to check it and handed on unchanged.
pub async fn verify_slack_request(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, SignatureError> {
    let Some(secret) = app_state.signing_secret() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let timestamp = header(&parts.headers, HEADER_TIMESTAMP)?;
    let signature = header(&parts.headers, HEADER_SIGNATURE)?;

    if !is_fresh(timestamp, chrono::Utc::now().timestamp()) {
        warn!(timestamp, "Rejecting request with stale timestamp");
        return Err(SignatureError::StaleTimestamp);
    }

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| SignatureError::UnreadableBody)?;
    if !verify_signature(timestamp, &bytes, signature, secret) {
        warn!(uri = %parts.uri, "Invalid Slack signature");
        return Err(SignatureError::InvalidSignature);
    }

    Ok(next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await)
}
