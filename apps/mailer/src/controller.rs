//! Draft lifecycle controller — generate → regenerate* → send.
//!
//! All session state lives in one [`SessionState`] behind a mutex that is
//! never held across an `.await`. Remote calls are the only suspension
//! points. Each operation follows the same shape:
//!
//! 1. validate against a snapshot of the draft (never touches the gate)
//! 2. acquire the gate for its kind, or bail out as busy
//! 3. clear the notification, call the service
//! 4. apply the result, notify, release the gate on drop
//!
//! Outcomes are returned for the caller's benefit only; everything the user
//! needs to see goes through the [`Notifier`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::draft::{Draft, DraftStore, ResumeAttachment};
use crate::errors::{RemoteError, ValidationError};
use crate::gate::{OperationGate, OperationKind};
use crate::normalizer::normalize;
use crate::notification::Notifier;
use crate::prompt::InstructionPrompt;
use crate::remote::{EmailService, OutgoingEmail};

pub const GENERATED_MESSAGE: &str = "Email generated successfully!";
pub const SENT_MESSAGE: &str = "Email sent successfully!";
pub const REGENERATED_MESSAGE: &str = "Email body regenerated successfully!";
pub const INSTRUCTION_QUESTION: &str =
    "How should the email body be changed? (leave empty for a general rewrite)";

/// How a triggered operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    /// Precondition failed; no request was made.
    Invalid(ValidationError),
    /// Another operation of the same kind is still in flight.
    Busy,
    /// The user dismissed the instruction prompt.
    Cancelled,
    /// The service call failed with this user-facing message.
    Failed(String),
}

/// Which actions can be triggered right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub generate: bool,
    pub send: bool,
    pub regenerate: bool,
}

/// The draft plus per-kind operation status.
#[derive(Debug, Default)]
pub struct SessionState {
    pub store: DraftStore,
    pub gate: OperationGate,
}

impl SessionState {
    pub fn affordances(&self) -> Affordances {
        Affordances {
            generate: !self.gate.is_in_flight(OperationKind::Generate),
            send: !self.gate.is_in_flight(OperationKind::Send),
            regenerate: !self.gate.is_in_flight(OperationKind::Regenerate)
                && self.store.draft().has_been_generated,
        }
    }
}

fn validate_generate(draft: &Draft) -> Result<(), ValidationError> {
    if draft.job_description.trim().is_empty() {
        return Err(ValidationError::MissingJobDescription);
    }
    Ok(())
}

fn validate_send(draft: &Draft) -> Result<(), ValidationError> {
    let required = [&draft.recipient, &draft.subject, &draft.body];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(ValidationError::IncompleteDraft);
    }
    Ok(())
}

fn validate_regenerate(draft: &Draft) -> Result<(), ValidationError> {
    if draft.body.trim().is_empty() {
        return Err(ValidationError::NothingToRegenerate);
    }
    Ok(())
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a gate slot; releases it when dropped, whichever way the operation exits.
struct InFlight {
    state: Arc<Mutex<SessionState>>,
    kind: OperationKind,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).gate.release(self.kind);
    }
}

pub struct DraftLifecycleController<S, P> {
    service: S,
    prompt: P,
    state: Arc<Mutex<SessionState>>,
    notifier: Notifier,
}

impl<S, P> DraftLifecycleController<S, P>
where
    S: EmailService,
    P: InstructionPrompt,
{
    pub fn new(service: S, prompt: P, notifier: Notifier) -> Self {
        Self {
            service,
            prompt,
            state: Arc::new(Mutex::new(SessionState::default())),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Snapshot of the draft.
    pub fn draft(&self) -> Draft {
        lock(&self.state).store.draft().clone()
    }

    pub fn affordances(&self) -> Affordances {
        lock(&self.state).affordances()
    }

    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        lock(&self.state).gate.is_in_flight(kind)
    }

    // ── direct edits ───────────────────────────────────────────────────────

    pub fn set_job_description(&self, text: impl Into<String>) {
        lock(&self.state).store.set_job_description(text);
    }

    pub fn set_resume(&self, resume: Option<ResumeAttachment>) {
        lock(&self.state).store.set_resume(resume);
    }

    pub fn set_recipient(&self, recipient: impl Into<String>) {
        lock(&self.state).store.set_recipient(recipient);
    }

    pub fn set_cc(&self, cc: impl Into<String>) {
        lock(&self.state).store.set_cc(cc);
    }

    pub fn set_subject(&self, subject: impl Into<String>) {
        lock(&self.state).store.set_subject(subject);
    }

    pub fn set_body(&self, body: impl Into<String>) {
        lock(&self.state).store.set_body(body);
    }

    // ── operations ─────────────────────────────────────────────────────────

    pub async fn generate(&self) -> OperationOutcome {
        let kind = OperationKind::Generate;
        let draft = self.draft();
        if let Err(invalid) = validate_generate(&draft) {
            return self.reject(kind, invalid);
        }

        let Some(_in_flight) = self.acquire(kind) else {
            return OperationOutcome::Busy;
        };
        self.notifier.clear();

        match self
            .service
            .generate(&draft.job_description, draft.resume.as_ref())
            .await
        {
            Ok(email) => {
                info!(operation = %kind, recipient = %email.recipient, "Draft generated");
                lock(&self.state).store.apply_generated(email);
                self.notifier.success(GENERATED_MESSAGE);
                OperationOutcome::Completed
            }
            Err(err) => self.fail(kind, err),
        }
    }

    pub async fn send(&self) -> OperationOutcome {
        let kind = OperationKind::Send;
        let draft = self.draft();
        if let Err(invalid) = validate_send(&draft) {
            return self.reject(kind, invalid);
        }

        let Some(_in_flight) = self.acquire(kind) else {
            return OperationOutcome::Busy;
        };
        self.notifier.clear();

        let email = OutgoingEmail {
            body: normalize(&draft.body),
            recipient: draft.recipient,
            cc: draft.cc,
            subject: draft.subject,
        };

        match self.service.send(&email, draft.resume.as_ref()).await {
            Ok(_) => {
                info!(operation = %kind, recipient = %email.recipient, "Email sent");
                self.notifier.success(SENT_MESSAGE);
                OperationOutcome::Completed
            }
            Err(err) => self.fail(kind, err),
        }
    }

    pub async fn regenerate(&self) -> OperationOutcome {
        let kind = OperationKind::Regenerate;
        if let Err(invalid) = validate_regenerate(&self.draft()) {
            return self.reject(kind, invalid);
        }
        if self.is_in_flight(kind) {
            debug!(operation = %kind, "Trigger ignored: already in flight");
            return OperationOutcome::Busy;
        }

        let response = self.prompt.ask(INSTRUCTION_QUESTION).await;
        if !response.provided {
            debug!(operation = %kind, "Instruction prompt cancelled");
            return OperationOutcome::Cancelled;
        }

        let Some(_in_flight) = self.acquire(kind) else {
            return OperationOutcome::Busy;
        };

        // The draft may have been edited while the prompt was open.
        let draft = self.draft();
        if let Err(invalid) = validate_regenerate(&draft) {
            return self.reject(kind, invalid);
        }
        self.notifier.clear();

        let instruction = Some(response.text.trim()).filter(|i| !i.is_empty());

        match self
            .service
            .regenerate(&draft.body, instruction, draft.resume.as_ref())
            .await
        {
            Ok(body) => {
                info!(operation = %kind, has_instruction = instruction.is_some(), "Body regenerated");
                lock(&self.state).store.set_body(body);
                self.notifier.success(REGENERATED_MESSAGE);
                OperationOutcome::Completed
            }
            Err(err) => self.fail(kind, err),
        }
    }

    fn acquire(&self, kind: OperationKind) -> Option<InFlight> {
        if !lock(&self.state).gate.try_acquire(kind) {
            debug!(operation = %kind, "Trigger ignored: already in flight");
            return None;
        }
        Some(InFlight {
            state: Arc::clone(&self.state),
            kind,
        })
    }

    fn reject(&self, kind: OperationKind, invalid: ValidationError) -> OperationOutcome {
        debug!(operation = %kind, "Validation failed: {invalid}");
        self.notifier.error(invalid.to_string());
        OperationOutcome::Invalid(invalid)
    }

    fn fail(&self, kind: OperationKind, err: RemoteError) -> OperationOutcome {
        let message = err.to_string();
        error!(operation = %kind, status = ?err.status_code(), error = ?err, "Operation failed");
        self.notifier.error(message.clone());
        OperationOutcome::Failed(message)
    }
}
