use thiserror::Error;

/// Failure of a single exchange with the email service.
///
/// `Display` is the text shown to the user, so the variants carry the exact
/// message rather than a prefixed description.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-2xx status. `detail` is the server's message or the operation fallback.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// Connection refused, reset, DNS failure and the like.
    #[error("{fallback}")]
    Transport {
        fallback: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// 2xx status but the payload did not match the expected envelope.
    #[error("{fallback}")]
    Malformed {
        fallback: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A precondition that failed before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter Job Description")]
    MissingJobDescription,

    #[error("Recipient, Subject and Body are required to send email")]
    IncompleteDraft,

    #[error("Please generate an email first before regenerating")]
    NothingToRegenerate,
}

/// Problems loading a résumé from disk.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Could not read resume file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Only PDF resumes are allowed: {0}")]
    NotPdf(String),

    #[error("Resume file is empty: {0}")]
    Empty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_detail_verbatim() {
        let err = RemoteError::Status {
            status: 400,
            detail: "Only PDF resumes allowed.".to_string(),
        };
        assert_eq!(err.to_string(), "Only PDF resumes allowed.");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_validation_messages_match_user_text() {
        assert_eq!(
            ValidationError::MissingJobDescription.to_string(),
            "Please enter Job Description"
        );
        assert_eq!(
            ValidationError::IncompleteDraft.to_string(),
            "Recipient, Subject and Body are required to send email"
        );
        assert_eq!(
            ValidationError::NothingToRegenerate.to_string(),
            "Please generate an email first before regenerating"
        );
    }
}
