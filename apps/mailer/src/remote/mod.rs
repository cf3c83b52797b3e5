//! Remote email service — the only place the app talks to the network.
//!
//! `EmailService` is the seam the controller depends on. `HttpEmailClient`
//! is the real implementation; tests swap in scripted fakes.

use async_trait::async_trait;
use serde::Deserialize;

use crate::draft::{GeneratedEmail, ResumeAttachment};
use crate::errors::RemoteError;

pub mod http;

pub use http::HttpEmailClient;

pub const GENERATE_PATH: &str = "/generate-email";
pub const SEND_PATH: &str = "/send-email";
pub const REGENERATE_PATH: &str = "/regenerate-body";

pub const GENERATE_FALLBACK: &str = "Failed to generate email";
pub const SEND_FALLBACK: &str = "Failed to send email";
pub const REGENERATE_FALLBACK: &str = "Failed to regenerate email";

/// An outgoing email, body already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
}

/// What the service answers after sending. Only `status` is ever looked at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendAcknowledgement {
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn generate(
        &self,
        job_description: &str,
        resume: Option<&ResumeAttachment>,
    ) -> Result<GeneratedEmail, RemoteError>;

    async fn send(
        &self,
        email: &OutgoingEmail,
        resume: Option<&ResumeAttachment>,
    ) -> Result<SendAcknowledgement, RemoteError>;

    /// `instruction` is `None` when the user gave nothing to go on.
    async fn regenerate(
        &self,
        original_body: &str,
        instruction: Option<&str>,
        resume: Option<&ResumeAttachment>,
    ) -> Result<String, RemoteError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire envelopes
// ────────────────────────────────────────────────────────────────────────────

/// `{ "data": { recipient, cc, subject, body } }`; any field may be null or absent.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateEnvelope {
    pub data: GeneratedFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GeneratedFields {
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<GeneratedFields> for GeneratedEmail {
    fn from(fields: GeneratedFields) -> Self {
        GeneratedEmail {
            recipient: fields.recipient.unwrap_or_default(),
            cc: fields.cc.unwrap_or_default(),
            subject: fields.subject.unwrap_or_default(),
            body: fields.body.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegenerateEnvelope {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FailureEnvelope {
    pub detail: Option<serde_json::Value>,
}

/// Pulls the user-facing message out of a failure body.
///
/// FastAPI validation errors put a list in `detail`; only string details are
/// shown verbatim.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let envelope: FailureEnvelope = serde_json::from_str(body).ok()?;
    match envelope.detail? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        _ => None,
    }
}
