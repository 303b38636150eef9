//! Optional Slack request signature check.
//!
//! When a signing secret is configured, every request except `/health` must
//! carry `X-Slack-Request-Timestamp` (within five minutes of now) and
//! `X-Slack-Signature: v0=<hex hmac-sha256("v0:<ts>:<body>")>`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use ring::hmac;
use tracing::warn;

const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

/// Axum middleware that rejects unsigned or stale Slack requests.
pub async fn slack_signature_middleware(
    State(signing_secret): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let (parts, body) = req.into_parts();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let timestamp = header("x-slack-request-timestamp");
    let signature = header("x-slack-signature");

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        warn!(
            component = "auth",
            event = "auth.signature_missing",
            path = %parts.uri.path(),
        );
        return Err(StatusCode::UNAUTHORIZED);
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let fresh = timestamp
        .parse::<i64>()
        .is_ok_and(|ts| (now - ts).abs() <= MAX_CLOCK_SKEW_SECS);

    if !fresh || !verify_signature(&signing_secret, &timestamp, &bytes, &signature) {
        warn!(
            component = "auth",
            event = "auth.signature_rejected",
            path = %parts.uri.path(),
            fresh = fresh,
        );
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

pub fn verify_signature(secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    let Some(expected) = signature.strip_prefix("v0=").and_then(decode_hex) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let mut message = format!("v0:{timestamp}:").into_bytes();
    message.extend_from_slice(body);
    hmac::verify(&key, &message, &expected).is_ok()
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let mut message = format!("v0:{timestamp}:").into_bytes();
    message.extend_from_slice(body);
    let tag = hmac::sign(&key, &message);
    let hex: String = tag.as_ref().iter().map(|b| format!("{b:02x}")).collect();
    format!("v0={hex}")
}
