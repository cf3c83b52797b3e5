//! The suspend point where regenerate asks the user how the body should change.
//!
//! Cancelling is different from answering with nothing: a cancelled prompt
//! aborts the regenerate, an empty answer asks for a default rewrite.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Notify};

/// Typed at the prompt to cancel instead of answering.
pub const CANCEL_COMMAND: &str = "/cancel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptResponse {
    pub provided: bool,
    pub text: String,
}

impl PromptResponse {
    pub fn provided(text: impl Into<String>) -> Self {
        Self {
            provided: true,
            text: text.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            provided: false,
            text: String::new(),
        }
    }
}

#[async_trait]
pub trait InstructionPrompt: Send + Sync {
    async fn ask(&self, message: &str) -> PromptResponse;
}

/// Routes the next input line to a waiting prompt.
///
/// The session owns the input and offers every line here first; a prompt
/// registers before it shows its question, so the answer never races the
/// command loop.
#[derive(Clone, Default)]
pub struct PromptAnswers {
    waiting: Arc<Mutex<Option<oneshot::Sender<String>>>>,
    registered: Arc<Notify>,
}

impl PromptAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    fn wait(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        *self.waiting.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        self.registered.notify_one();
        rx
    }

    /// Hands `line` to a waiting prompt. Gives it back when nobody is waiting.
    pub fn offer(&self, line: String) -> Option<String> {
        let waiting = self
            .waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match waiting {
            Some(tx) => tx.send(line).err(),
            None => Some(line),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Resolves after a prompt registers. May wake spuriously; check [`Self::is_waiting`].
    pub async fn registered(&self) {
        self.registered.notified().await;
    }

    /// No more input is coming: a waiting prompt is cancelled.
    pub fn close(&self) {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Asks on a terminal. End of input or [`CANCEL_COMMAND`] cancels.
pub struct TerminalPrompt<W> {
    answers: PromptAnswers,
    out: Arc<tokio::sync::Mutex<W>>,
}

impl<W> TerminalPrompt<W> {
    pub fn new(answers: PromptAnswers, out: Arc<tokio::sync::Mutex<W>>) -> Self {
        Self { answers, out }
    }
}

#[async_trait]
impl<W> InstructionPrompt for TerminalPrompt<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn ask(&self, message: &str) -> PromptResponse {
        let answer = self.answers.wait();
        {
            let mut out = self.out.lock().await;
            let written = out.write_all(format!("{message}\n> ").as_bytes()).await;
            if written.is_err() || out.flush().await.is_err() {
                return PromptResponse::cancelled();
            }
        }

        match answer.await {
            Ok(line) if line.trim() == CANCEL_COMMAND => PromptResponse::cancelled(),
            Ok(line) => PromptResponse::provided(line),
            Err(_) => PromptResponse::cancelled(),
        }
    }
}
