/// Outbound delivery: image hosting and chat replies
///
/// This module handles:
/// - Uploading the rendered table to the image host
/// - Replying on the messaging channel (image or text)
/// - Printing replies to the console for local runs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = "ticket-board/0.1.0";

pub const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
pub const LINE_REPLY_URL: &str = "https://api.line.me/v2/bot/message/reply";

/// What gets sent back to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Rendered table, by public URL (or local path when not uploading)
    Image { url: String },
    Text(String),
}

/// Error during upload or reply
#[derive(Debug)]
pub enum DeliveryError {
    /// Remote answered with a non-success status
    Status { code: u16, body: String },
    /// Connection, TLS, DNS or timeout failure
    Transport(String),
    /// Remote answered 2xx but the body was not what we expected
    Response(String),
    Io(std::io::Error),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Status { code, body } => write!(f, "HTTP {}: {}", code, body),
            DeliveryError::Transport(e) => write!(f, "transport error: {}", e),
            DeliveryError::Response(e) => write!(f, "unexpected response: {}", e),
            DeliveryError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl From<std::io::Error> for DeliveryError {
    fn from(e: std::io::Error) -> Self {
        DeliveryError::Io(e)
    }
}

impl From<ureq::Error> for DeliveryError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                DeliveryError::Status { code, body }
            }
            ureq::Error::Transport(transport) => DeliveryError::Transport(transport.to_string()),
        }
    }
}

/// Build the shared HTTP agent with connect/read/write timeouts
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .build()
}

//
// Image Hosting
//

/// Somewhere to publish the rendered image
pub trait ImageHost {
    /// Upload the image at `path` and return its public URL
    fn upload(&self, path: &Path) -> Result<String, DeliveryError>;
}

/// imgbb upload API
pub struct ImgbbHost {
    agent: ureq::Agent,
    api_key: String,
    endpoint: String,
}

impl ImgbbHost {
    pub fn new(agent: ureq::Agent, api_key: &str) -> Self {
        ImgbbHost { agent, api_key: api_key.to_string(), endpoint: IMGBB_UPLOAD_URL.to_string() }
    }

    /// Point at a different endpoint (local test servers)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

impl ImageHost for ImgbbHost {
    fn upload(&self, path: &Path) -> Result<String, DeliveryError> {
        let encoded = STANDARD.encode(fs::read(path)?);
        debug!("uploading {} ({} base64 bytes)", path.display(), encoded.len());

        let response = self.agent.post(&self.endpoint).send_form(&[("key", self.api_key.as_str()), ("image", encoded.as_str())])?;
        let body: serde_json::Value =
            serde_json::from_reader(response.into_reader()).map_err(|e| DeliveryError::Response(e.to_string()))?;

        parse_upload_url(&body)
    }
}

/// Pull `data.url` out of an upload response
pub fn parse_upload_url(body: &serde_json::Value) -> Result<String, DeliveryError> {
    body.get("data")
        .and_then(|d| d.get("url"))
        .and_then(|u| u.as_str())
        .map(|u| u.to_string())
        .ok_or_else(|| DeliveryError::Response(format!("no data.url in upload response: {}", body)))
}

//
// Chat Replies
//

/// Somewhere to send a reply
pub trait Messenger {
    fn send(&self, reply: &Reply) -> Result<(), DeliveryError>;
}

/// LINE reply API for one inbound event
pub struct LineMessenger {
    agent: ureq::Agent,
    access_token: String,
    reply_token: String,
    endpoint: String,
}

impl LineMessenger {
    pub fn new(agent: ureq::Agent, access_token: &str, reply_token: &str) -> Self {
        LineMessenger {
            agent,
            access_token: access_token.to_string(),
            reply_token: reply_token.to_string(),
            endpoint: LINE_REPLY_URL.to_string(),
        }
    }
}

/// JSON body for a reply request
pub fn reply_payload(reply_token: &str, reply: &Reply) -> serde_json::Value {
    use serde_json::json;

    let message = match reply {
        Reply::Image { url } => json!({
            "type": "image",
            "originalContentUrl": url,
            "previewImageUrl": url,
        }),
        Reply::Text(text) => json!({ "type": "text", "text": text }),
    };

    json!({ "replyToken": reply_token, "messages": [message] })
}

impl Messenger for LineMessenger {
    fn send(&self, reply: &Reply) -> Result<(), DeliveryError> {
        let payload = reply_payload(&self.reply_token, reply);
        self.agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Content-Type", "application/json")
            .send_string(&payload.to_string())?;
        debug!("sent reply for token {}", self.reply_token);
        Ok(())
    }
}

/// Prints replies instead of sending them
pub struct ConsoleMessenger;

impl Messenger for ConsoleMessenger {
    fn send(&self, reply: &Reply) -> Result<(), DeliveryError> {
        match reply {
            Reply::Image { url } => crate::ui::status(&format!("table image: {}", url)),
            Reply::Text(text) => {
                for line in text.lines() {
                    crate::ui::status(line);
                }
            }
        }
        Ok(())
    }
}

/// Send a reply, logging instead of failing when the channel rejects it
pub fn send_or_log(messenger: &dyn Messenger, reply: &Reply) -> bool {
    match messenger.send(reply) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to deliver reply: {}", e);
            false
        }
    }
}
