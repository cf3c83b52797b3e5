//! Single-slot, auto-expiring user notifications.
//!
//! The current notification is published on a `watch` channel so the session
//! can redraw whenever it changes. Emitting replaces whatever is showing and
//! arms its own expiry timer; a timer only clears the notification it was
//! armed for.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub kind: NotificationKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Instant,
}

#[derive(Clone)]
pub struct Notifier {
    slot: Arc<watch::Sender<Option<Notification>>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.slot.subscribe()
    }

    pub fn current(&self) -> Option<Notification> {
        self.slot.borrow().clone()
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Success, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Error, text.into());
    }

    pub fn clear(&self) {
        self.slot.send_if_modified(|current| current.take().is_some());
    }

    /// Must be called from within a Tokio runtime; the expiry timer is a spawned task.
    fn emit(&self, kind: NotificationKind, text: String) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = Instant::now() + self.ttl;

        match kind {
            NotificationKind::Success => info!(id, "{text}"),
            NotificationKind::Error => warn!(id, "{text}"),
        }

        self.slot.send_replace(Some(Notification {
            id,
            text,
            kind,
            issued_at: Utc::now(),
            expires_at,
        }));

        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let cleared = slot.send_if_modified(|current| {
                if current.as_ref().is_some_and(|n| n.id == id) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
            if cleared {
                debug!(id, "Notification expired");
            }
        });
    }
}
