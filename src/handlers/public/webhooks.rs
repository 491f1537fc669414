use axum::{body::Bytes, extract::State, http::HeaderMap};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use thiserror::Error;

use crate::app::AppState;
use crate::error::ApiError;
use crate::identity::identity_from_payload;
use crate::middleware::{ApiResponse, ApiResult};
use crate::onboarding::user_record;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing x-webhook-signature header")]
    MissingSignature,

    #[error("Webhook signature mismatch")]
    InvalidSignature,

    #[error("Webhook secret not configured")]
    NotConfigured,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                ApiError::unauthorized(err.to_string())
            }
            WebhookError::NotConfigured => ApiError::service_unavailable("Webhooks are not enabled"),
            WebhookError::InvalidPayload(_) => ApiError::bad_request(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Hex HMAC-SHA256 of `body` under `secret`
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| WebhookError::NotConfigured)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature, optionally prefixed with `sha256=`, in constant time
pub fn verify_signature(secret: &[u8], body: &[u8], header: &str) -> Result<(), WebhookError> {
    let header = header.trim();
    let encoded = header.strip_prefix("sha256=").unwrap_or(header);
    let expected = hex::decode(encoded).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| WebhookError::InvalidSignature)
}

/// POST /api/webhooks/identity - mirror provider user lifecycle events
///
/// `user.created` and `user.updated` sync the local row, `user.deleted` removes it.
/// Other event types are acknowledged and ignored.
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "type": "user.created", "handled": true } }
/// ```
pub async fn identity_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let secret = state
        .config
        .identity
        .webhook_secret
        .as_deref()
        .ok_or(WebhookError::NotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    if let Err(e) = verify_signature(secret.as_bytes(), &body, signature) {
        state.logger.warn("Rejected webhook with bad signature", None);
        return Err(e.into());
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    let handled = match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let identity = identity_from_payload(event.data)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
            state.store.sync_user(&user_record(&identity)).await?;
            true
        }
        "user.deleted" => {
            let id = event
                .data
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| WebhookError::InvalidPayload("missing data.id".to_string()))?;
            state.store.delete_user(id).await?;
            true
        }
        other => {
            state
                .logger
                .debug("Ignoring webhook event", Some(&json!({ "type": other })));
            false
        }
    };

    Ok(ApiResponse::success(json!({
        "type": event.kind,
        "handled": handled,
    })))
}
