//! Draft store — the single mutable draft record of a session.
//!
//! Setters never validate. Preconditions belong to the controller.

use std::path::Path;

use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::AttachmentError;

/// The mail provider rejects attachments above this size.
pub const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";

/// A résumé PDF held in memory. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeAttachment {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ResumeAttachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a résumé from disk, accepting only non-empty PDFs.
    pub async fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let display = path.display().to_string();
        let bytes = tokio::fs::read(path).await?;

        if bytes.is_empty() {
            return Err(AttachmentError::Empty(display));
        }

        let has_pdf_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !has_pdf_extension && !bytes.starts_with(PDF_MAGIC) {
            return Err(AttachmentError::NotPdf(display));
        }

        if bytes.len() > MAX_ATTACHMENT_BYTES {
            warn!(
                size = bytes.len(),
                "Resume is larger than 25MB; the mail provider may refuse it"
            );
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume.pdf")
            .to_string();

        info!(file_name = %file_name, size = bytes.len(), "Loaded resume attachment");
        Ok(Self::new(file_name, bytes))
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME
    }
}

/// Everything the user is composing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub job_description: String,
    pub resume: Option<ResumeAttachment>,
    pub recipient: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
    pub has_been_generated: bool,
}

/// Fields produced by a successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedEmail {
    pub recipient: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
}

/// Owner of the session's only [`Draft`].
#[derive(Debug, Default)]
pub struct DraftStore {
    draft: Draft,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.draft.job_description = text.into();
    }

    /// Replaces any previously held résumé.
    pub fn set_resume(&mut self, resume: Option<ResumeAttachment>) {
        self.draft.resume = resume;
    }

    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.draft.recipient = recipient.into();
    }

    pub fn set_cc(&mut self, cc: impl Into<String>) {
        self.draft.cc = cc.into();
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.draft.subject = subject.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.draft.body = body.into();
    }

    /// Overwrites the four generated fields and marks the draft as generated.
    pub fn apply_generated(&mut self, email: GeneratedEmail) {
        let GeneratedEmail {
            recipient,
            cc,
            subject,
            body,
        } = email;
        self.draft.recipient = recipient;
        self.draft.cc = cc;
        self.draft.subject = subject;
        self.draft.body = body;
        self.draft.has_been_generated = true;
    }
}
