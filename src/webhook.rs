/// Webhook intake for the messaging channel
///
/// This module handles:
/// - Verifying the channel signature header (base64 HMAC-SHA256 of the body)
/// - Extracting text messages and their reply tokens from the event payload

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use log::debug;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Error raised while accepting a webhook delivery
#[derive(Debug)]
pub enum WebhookError {
    /// Signature header missing, undecodable, or not matching the body
    InvalidSignature,
    /// Body is not a valid event payload
    InvalidPayload(String),
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookError::InvalidSignature => write!(f, "webhook signature does not match body"),
            WebhookError::InvalidPayload(e) => write!(f, "invalid webhook payload: {}", e),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Check `signature` against the channel secret and raw body
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> Result<(), WebhookError> {
    let expected = STANDARD.decode(signature.trim()).map_err(|_| WebhookError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| WebhookError::InvalidSignature)
}

/// A text message that can be answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub reply_token: String,
    pub text: String,
}

#[derive(Debug, serde::Deserialize)]
struct Payload {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    message: Option<Message>,
}

#[derive(Debug, serde::Deserialize)]
struct Message {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Pull every text message event out of a webhook body.
/// Other event and message types are skipped.
pub fn parse_text_events(body: &[u8]) -> Result<Vec<TextEvent>, WebhookError> {
    let payload: Payload = serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    let events: Vec<TextEvent> = payload
        .events
        .into_iter()
        .filter(|e| e.kind == "message")
        .filter_map(|e| {
            let message = e.message?;
            if message.kind != "text" {
                return None;
            }
            Some(TextEvent { reply_token: e.reply_token?, text: message.text? })
        })
        .collect();

    debug!("webhook carried {} text events", events.len());
    Ok(events)
}
