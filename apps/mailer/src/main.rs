mod config;
mod controller;
mod draft;
mod errors;
mod gate;
mod normalizer;
mod notification;
mod prompt;
mod remote;
mod session;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::controller::DraftLifecycleController;
use crate::draft::ResumeAttachment;
use crate::notification::Notifier;
use crate::prompt::{PromptAnswers, TerminalPrompt};
use crate::remote::HttpEmailClient;
use crate::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr so they stay out of the session transcript.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting mailer v{}", env!("CARGO_PKG_VERSION"));

    let service = HttpEmailClient::new(config.service_url.clone());
    info!("Email service at {}", service.base_url());

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let out = Arc::new(Mutex::new(tokio::io::stdout()));
    let answers = PromptAnswers::new();

    let prompt = TerminalPrompt::new(answers.clone(), Arc::clone(&out));
    let controller = Arc::new(DraftLifecycleController::new(
        service,
        prompt,
        Notifier::new(),
    ));

    if let Some(path) = &config.resume_path {
        match ResumeAttachment::from_path(path).await {
            Ok(resume) => controller.set_resume(Some(resume)),
            Err(e) => warn!("Ignoring RESUME_PATH: {e}"),
        }
    }

    let mut session = Session::new(controller, lines, answers, out);
    let printer = session.spawn_notification_printer();
    session.run().await?;
    printer.abort();

    info!("Session ended");
    Ok(())
}
