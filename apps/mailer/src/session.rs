//! Line commands in, draft and notifications out.
//!
//! Thin glue over [`DraftLifecycleController`]; no lifecycle rules live here.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::{oneshot, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::controller::{DraftLifecycleController, OperationOutcome};
use crate::draft::{Draft, ResumeAttachment};
use crate::gate::OperationKind;
use crate::notification::{Notification, NotificationKind, Notifier};
use crate::prompt::{InstructionPrompt, PromptAnswers};
use crate::remote::EmailService;

const HELP: &str = "\
Commands:
  jd <text>        append a line to the job description
  jd-clear         clear the job description
  resume <path>    attach a PDF resume
  resume-clear     remove the resume
  to <address>     set the recipient
  cc <address>     set cc
  subject <text>   set the subject
  body <html>      replace the body
  generate         draft an email from the job description
  regenerate       rewrite the body with an instruction
  send             send the email
  show             print the current draft
  help             print this help
  quit             leave

At the regenerate prompt, type /cancel to back out.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AppendJobDescription(String),
    ClearJobDescription,
    AttachResume(String),
    ClearResume,
    Recipient(String),
    Cc(String),
    Subject(String),
    Body(String),
    Generate,
    Regenerate,
    Send,
    Show,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let rest = rest.to_string();

        let command = match word {
            "jd" => Command::AppendJobDescription(rest),
            "jd-clear" => Command::ClearJobDescription,
            "resume" if !rest.is_empty() => Command::AttachResume(rest),
            "resume" => return Err("usage: resume <path>".to_string()),
            "resume-clear" => Command::ClearResume,
            "to" => Command::Recipient(rest),
            "cc" => Command::Cc(rest),
            "subject" => Command::Subject(rest),
            "body" => Command::Body(rest),
            "generate" => Command::Generate,
            "regenerate" => Command::Regenerate,
            "send" => Command::Send,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

pub fn render_notification(notification: &Notification) -> String {
    let marker = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
    };
    format!(
        "[{}] {marker}: {}",
        notification.issued_at.format("%H:%M:%S"),
        notification.text
    )
}

pub fn render_draft(draft: &Draft) -> String {
    let resume = draft
        .resume
        .as_ref()
        .map(|r| format!("{} ({} bytes)", r.file_name, r.bytes.len()))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Job description: {} chars\nResume: {resume}\nTo: {}\nCc: {}\nSubject: {}\nBody:\n{}\n",
        draft.job_description.chars().count(),
        draft.recipient,
        draft.cc,
        draft.subject,
        draft.body
    )
}

/// Shown when a trigger arrives while the same kind is still in flight.
fn busy_message(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Generate => "Generating... please wait\n",
        OperationKind::Send => "Sending... please wait\n",
        OperationKind::Regenerate => "Regenerating... please wait\n",
    }
}

async fn write_out<W>(out: &Mutex<W>, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = out.lock().await;
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

/// Prints every new notification as it appears. Stops once `out` fails.
pub fn spawn_notification_printer<W>(notifier: &Notifier, out: Arc<Mutex<W>>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let line = {
                let current = rx.borrow_and_update();
                current.as_ref().map(render_notification)
            };
            let Some(line) = line else {
                continue;
            };
            if let Err(err) = write_out(&out, &format!("{line}\n")).await {
                debug!("Notification output closed: {err}");
                break;
            }
        }
    })
}

/// Reads commands and runs each operation as its own task, so a send can go
/// out while a generate is still waiting on the service.
pub struct Session<S, P, R, W> {
    controller: Arc<DraftLifecycleController<S, P>>,
    lines: Lines<R>,
    answers: PromptAnswers,
    out: Arc<Mutex<W>>,
    operations: JoinSet<()>,
}

impl<S, P, R, W> Session<S, P, R, W>
where
    S: EmailService + 'static,
    P: InstructionPrompt + 'static,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// `answers` must be the handle the controller's prompt waits on.
    pub fn new(
        controller: Arc<DraftLifecycleController<S, P>>,
        lines: Lines<R>,
        answers: PromptAnswers,
        out: Arc<Mutex<W>>,
    ) -> Self {
        Self {
            controller,
            lines,
            answers,
            out,
            operations: JoinSet::new(),
        }
    }

    pub fn spawn_notification_printer(&self) -> JoinHandle<()> {
        spawn_notification_printer(self.controller.notifier(), Arc::clone(&self.out))
    }

    /// Reads commands until `quit` or end of input, then waits for
    /// outstanding operations.
    pub async fn run(&mut self) -> Result<()> {
        self.say("Job application email assistant. Type 'help' for commands.\n")
            .await?;

        while let Some(line) = self.lines.next_line().await? {
            let Some(line) = self.answers.offer(line) else {
                continue;
            };
            match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.dispatch(command).await?,
                Ok(None) => {}
                Err(usage) => self.say(&format!("{usage}\n")).await?,
            }
        }

        self.answers.close();
        while let Some(joined) = self.operations.join_next().await {
            if let Err(err) = joined {
                warn!("Operation task ended abnormally: {err}");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        let controller = Arc::clone(&self.controller);
        match command {
            Command::AppendJobDescription(text) => {
                let mut jd = controller.draft().job_description;
                if !jd.is_empty() {
                    jd.push('\n');
                }
                jd.push_str(&text);
                controller.set_job_description(jd);
            }
            Command::ClearJobDescription => controller.set_job_description(String::new()),
            Command::AttachResume(path) => self.attach_resume(Path::new(&path)).await?,
            Command::ClearResume => controller.set_resume(None),
            Command::Recipient(value) => controller.set_recipient(value),
            Command::Cc(value) => controller.set_cc(value),
            Command::Subject(value) => controller.set_subject(value),
            Command::Body(value) => controller.set_body(value),
            Command::Generate => {
                if !controller.affordances().generate {
                    return self.say(busy_message(OperationKind::Generate)).await;
                }
                self.spawn_operation(OperationKind::Generate);
                // let it claim the gate before the next command is read
                tokio::task::yield_now().await;
            }
            Command::Send => {
                if !controller.affordances().send {
                    return self.say(busy_message(OperationKind::Send)).await;
                }
                self.spawn_operation(OperationKind::Send);
                tokio::task::yield_now().await;
            }
            Command::Regenerate => {
                if controller.is_in_flight(OperationKind::Regenerate) {
                    return self.say(busy_message(OperationKind::Regenerate)).await;
                }
                if !controller.affordances().regenerate {
                    return self
                        .say("regenerate is available once an email has been generated\n")
                        .await;
                }
                let mut finished = self.spawn_operation(OperationKind::Regenerate);
                // The next line belongs to the instruction prompt, so hold
                // the loop until it is listening or the operation is over.
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut finished => break,
                        _ = self.answers.registered() => {
                            if self.answers.is_waiting() {
                                break;
                            }
                        }
                    }
                }
            }
            Command::Show => self.say(&render_draft(&controller.draft())).await?,
            Command::Help => self.say(HELP).await?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Runs `kind` on its own task. The receiver resolves when the task ends.
    fn spawn_operation(&mut self, kind: OperationKind) -> oneshot::Receiver<()> {
        let controller = Arc::clone(&self.controller);
        let out = Arc::clone(&self.out);
        let (finished_tx, finished_rx) = oneshot::channel::<()>();

        self.operations.spawn(async move {
            let _finished = finished_tx;
            let outcome = match kind {
                OperationKind::Generate => controller.generate().await,
                OperationKind::Send => controller.send().await,
                OperationKind::Regenerate => controller.regenerate().await,
            };
            debug!(operation = %kind, ?outcome, "Operation finished");

            let text = match outcome {
                OperationOutcome::Completed => render_draft(&controller.draft()),
                OperationOutcome::Busy => busy_message(kind).to_string(),
                _ => return,
            };
            if let Err(err) = write_out(&out, &text).await {
                warn!(operation = %kind, "Could not print result: {err}");
            }
        });
        finished_rx
    }

    async fn attach_resume(&self, path: &Path) -> Result<()> {
        match ResumeAttachment::from_path(path).await {
            Ok(resume) => {
                let line = format!("attached {}\n", resume.file_name);
                self.controller.set_resume(Some(resume));
                self.say(&line).await
            }
            Err(err) => self.say(&format!("{err}\n")).await,
        }
    }

    async fn say(&self, text: &str) -> Result<()> {
        write_out(&self.out, text).await?;
        Ok(())
    }
}
