use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::correlator;
use crate::state::AppState;
use redrelay_infra::store::StoreError;

const HEADER_SIGNATURE: &str = "x-relay-signature-256";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid payload")]
    InvalidPayload,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct ReplyEventPayload {
    event_name: Option<String>,
    user_message_info: Option<MessageInfo>,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Message {
    body: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    text: Option<String>,
}

/// Chatbot reply events arrive here. Anything that is not a well-formed
/// message event is acknowledged and dropped so the sender never retries.
pub async fn chatbot_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature =
            header_value(&headers, HEADER_SIGNATURE).ok_or(WebhookError::MissingSignature)?;
        if !verify_signature(secret, &body, signature) {
            return Err(WebhookError::InvalidSignature);
        }
    }

    let payload: ReplyEventPayload =
        serde_json::from_slice(&body).map_err(|_| WebhookError::InvalidPayload)?;
    if payload.event_name.as_deref() != Some("message") {
        return Ok(StatusCode::ACCEPTED);
    }
    let Some(message_id) = extract_message_id(&payload) else {
        warn!("message event without a message id");
        return Ok(StatusCode::ACCEPTED);
    };
    let Some(text) = extract_text(&payload) else {
        warn!(message_id, "message event without body text");
        return Ok(StatusCode::ACCEPTED);
    };

    correlator::handle_reply_event(&state.store, &message_id, &text).await?;
    Ok(StatusCode::OK)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = match signature.strip_prefix("sha256=") {
        Some(value) => value,
        None => return false,
    };
    let signature = match hex::decode(signature) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Message ids show up as strings or numbers depending on the sender.
fn extract_message_id(payload: &ReplyEventPayload) -> Option<String> {
    match payload.user_message_info.as_ref()?.id.as_ref()? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn extract_text(payload: &ReplyEventPayload) -> Option<String> {
    payload
        .message
        .as_ref()?
        .body
        .as_ref()?
        .text
        .as_ref()
        .filter(|text| !text.is_empty())
        .cloned()
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            WebhookError::MissingSignature | WebhookError::InvalidPayload => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
