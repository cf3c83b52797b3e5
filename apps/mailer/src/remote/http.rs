use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    extract_detail, EmailService, GenerateEnvelope, OutgoingEmail, RegenerateEnvelope,
    SendAcknowledgement, GENERATE_FALLBACK, GENERATE_PATH, REGENERATE_FALLBACK, REGENERATE_PATH,
    SEND_FALLBACK, SEND_PATH,
};
use crate::draft::{GeneratedEmail, ResumeAttachment};
use crate::errors::RemoteError;

/// Multipart client for the email service.
///
/// No timeout is configured: a request runs until the service answers or
/// the connection fails.
#[derive(Clone)]
pub struct HttpEmailClient {
    client: Client,
    base_url: String,
}

impl HttpEmailClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Posts a multipart form and returns the raw body of a 2xx response.
    async fn post_form(
        &self,
        path: &str,
        form: Form,
        fallback: &'static str,
    ) -> Result<String, RemoteError> {
        let url = self.endpoint(path);
        let request_id = Uuid::new_v4();
        debug!(%request_id, %url, "Dispatching request");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| {
                warn!(%request_id, %url, "Request failed: {source}");
                RemoteError::Transport { fallback, source }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport { fallback, source })?;

        if !status.is_success() {
            let detail = extract_detail(&body).unwrap_or_else(|| fallback.to_string());
            warn!(%request_id, status = status.as_u16(), %detail, "Email service returned an error");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        info!(%request_id, status = status.as_u16(), "{path} succeeded");
        Ok(body)
    }
}

fn parse<T: DeserializeOwned>(body: &str, fallback: &'static str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|source| RemoteError::Malformed { fallback, source })
}

fn attach_resume(
    form: Form,
    resume: Option<&ResumeAttachment>,
    fallback: &'static str,
) -> Result<Form, RemoteError> {
    let Some(resume) = resume else {
        return Ok(form);
    };
    // `Bytes` clones share the buffer; the length keeps the request non-chunked.
    let part = Part::stream_with_length(resume.bytes.clone(), resume.bytes.len() as u64)
        .file_name(resume.file_name.clone())
        .mime_str(resume.mime_type())
        .map_err(|source| RemoteError::Transport { fallback, source })?;
    Ok(form.part("resume_file", part))
}

#[async_trait]
impl EmailService for HttpEmailClient {
    async fn generate(
        &self,
        job_description: &str,
        resume: Option<&ResumeAttachment>,
    ) -> Result<GeneratedEmail, RemoteError> {
        let form = Form::new().text("jd_text", job_description.to_string());
        let form = attach_resume(form, resume, GENERATE_FALLBACK)?;

        let body = self
            .post_form(GENERATE_PATH, form, GENERATE_FALLBACK)
            .await?;
        let envelope: GenerateEnvelope = parse(&body, GENERATE_FALLBACK)?;
        Ok(envelope.data.into())
    }

    async fn send(
        &self,
        email: &OutgoingEmail,
        resume: Option<&ResumeAttachment>,
    ) -> Result<SendAcknowledgement, RemoteError> {
        let form = Form::new()
            .text("recipient", email.recipient.clone())
            .text("cc", email.cc.clone())
            .text("subject", email.subject.clone())
            .text("body", email.body.clone());
        let form = attach_resume(form, resume, SEND_FALLBACK)?;

        let body = self.post_form(SEND_PATH, form, SEND_FALLBACK).await?;
        // The acknowledgement is informational only; odd shapes are not a failure.
        let ack: SendAcknowledgement = serde_json::from_str(&body).unwrap_or_default();
        if let Some(status) = &ack.status {
            debug!(%status, "Send acknowledged");
        }
        Ok(ack)
    }

    async fn regenerate(
        &self,
        original_body: &str,
        instruction: Option<&str>,
        resume: Option<&ResumeAttachment>,
    ) -> Result<String, RemoteError> {
        let mut form = Form::new().text("original_body", original_body.to_string());
        if let Some(instruction) = instruction.map(str::trim).filter(|i| !i.is_empty()) {
            form = form.text("instruction", instruction.to_string());
        }
        let form = attach_resume(form, resume, REGENERATE_FALLBACK)?;

        let body = self
            .post_form(REGENERATE_PATH, form, REGENERATE_FALLBACK)
            .await?;
        let envelope: RegenerateEnvelope = parse(&body, REGENERATE_FALLBACK)?;
        Ok(envelope.body)
    }
}
